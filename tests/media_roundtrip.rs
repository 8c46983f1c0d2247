//! Upload/download round trips against a mock home server.

mod support;

use std::sync::mpsc;
use std::time::Duration;

use mxmedia_core::{Client, ClientConfig, ContentUri, ErrorKind, media_id_of};
use support::{ACCESS_TOKEN, PASSWORD, SERVER_NAME, USER, mount_home_server};

fn client_for(server: &wiremock::MockServer) -> Client {
    Client::new(&server.uri()).expect("mock server uri should be a valid home server")
}

#[tokio::test]
async fn test_text_round_trip_preserves_data_type_and_filename() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let client = client_for(&server);

    let login = client.login_async(USER, PASSWORD).await.expect("login should succeed");
    assert_eq!(login.access_token, ACCESS_TOKEN);
    assert!(client.is_authenticated());
    assert_eq!(client.user_id().as_deref(), Some("@alice:localhost"));

    let data = "This is some random text";
    let uri = client
        .upload_async(data, "text/plain", "doc.txt")
        .await
        .expect("upload should succeed");

    let uri_string = uri.to_string();
    assert!(uri_string.starts_with("mxc://"));
    let media_id = media_id_of(&uri_string).unwrap();
    assert!(!media_id.is_empty());
    assert_eq!(media_id, uri.media_id());
    assert_eq!(repo.len(), 1);

    let media = client
        .download_async(SERVER_NAME, &media_id)
        .await
        .expect("download should succeed");
    assert_eq!(media.content, data.as_bytes());
    assert_eq!(media.content_type, "text/plain");
    assert_eq!(media.filename.as_deref(), Some("doc.txt"));

    client.close();
}

#[tokio::test]
async fn test_binary_round_trip_is_byte_exact() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_home_server(&server).await;
    let client = client_for(&server);
    client.login_async(USER, PASSWORD).await.unwrap();

    // ID3 header followed by bytes that are not valid UTF-8.
    let mut data = vec![0x49, 0x44, 0x33, 0x03, 0x00, 0x00, 0xff, 0xfe, 0x00, 0x80];
    data.extend((0u8..=255).rev());

    let uri = client.upload_async(data.clone(), "audio/mp3", "sound.mp3").await.unwrap();
    let media = client.download_async(uri.authority(), uri.media_id()).await.unwrap();

    assert_eq!(media.content, data);
    assert_eq!(media.content_type, "audio/mp3");
    assert_eq!(media.filename.as_deref(), Some("sound.mp3"));
}

#[tokio::test]
async fn test_image_round_trip_from_file() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let client = client_for(&server);
    client.login_async(USER, PASSWORD).await.unwrap();

    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("photo.jpeg");
    let jpeg = [0xffu8, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xff, 0xd9];
    std::fs::write(&path, jpeg).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let uri = client.upload_async(bytes, "image/jpeg", "photo.jpeg").await.unwrap();

    let stored = repo.get(uri.media_id()).expect("upload should reach the server");
    assert_eq!(stored.content, jpeg);
    assert_eq!(stored.content_type, "image/jpeg");
    assert_eq!(stored.filename.as_deref(), Some("photo.jpeg"));

    let media = client.download_async(SERVER_NAME, uri.media_id()).await.unwrap();
    assert_eq!(media.content, jpeg);
    assert_eq!(media.content_type, "image/jpeg");
}

#[tokio::test]
async fn test_empty_filename_is_not_sent() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let client = client_for(&server);
    client.login_async(USER, PASSWORD).await.unwrap();

    let uri = client.upload_async(b"x".to_vec(), "text/plain", "").await.unwrap();
    assert_eq!(repo.get(uri.media_id()).unwrap().filename, None);

    let media = client.download_async(SERVER_NAME, uri.media_id()).await.unwrap();
    assert_eq!(media.filename, None);
}

#[tokio::test]
async fn test_empty_content_type_downloads_as_octet_stream() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let client = client_for(&server);
    client.login_async(USER, PASSWORD).await.unwrap();

    let uri = client.upload_async(vec![0u8, 1, 2], "", "blob.bin").await.unwrap();
    assert_eq!(
        repo.get(uri.media_id()).unwrap().content_type,
        "application/octet-stream"
    );

    let media = client.download_async(SERVER_NAME, uri.media_id()).await.unwrap();
    assert_eq!(media.content_type, "application/octet-stream");
    assert_eq!(media.content, vec![0u8, 1, 2]);
}

#[tokio::test]
async fn test_filename_needing_quoting_round_trips() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let client = client_for(&server);
    client.login_async(USER, PASSWORD).await.unwrap();

    for filename in ["my notes; v2 (ä).txt", "quote \"x\".txt", "naïve résumé.pdf"] {
        let uri = client
            .upload_async(b"named".to_vec(), "text/plain", filename)
            .await
            .unwrap();
        assert_eq!(
            repo.get(uri.media_id()).unwrap().filename.as_deref(),
            Some(filename)
        );

        let media = client.download_async(SERVER_NAME, uri.media_id()).await.unwrap();
        assert_eq!(media.filename.as_deref(), Some(filename));
        assert_eq!(media.content, b"named");
    }
}

#[tokio::test]
async fn test_callback_api_round_trip() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_home_server(&server).await;
    let client = client_for(&server);

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.login(USER, PASSWORD, move |result| {
        let _ = tx.send(result);
    });
    rx.await.unwrap().expect("login should succeed");

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.upload(b"callback payload".to_vec(), "text/plain", "cb.txt", move |result| {
        let _ = tx.send(result);
    });
    let uri: ContentUri = rx.await.unwrap().expect("upload should succeed");

    let (tx, rx) = tokio::sync::oneshot::channel();
    client.download_uri(&uri, move |result| {
        let _ = tx.send(result);
    });
    let media = rx.await.unwrap().expect("download should succeed");
    assert_eq!(media.content, b"callback payload");
    assert_eq!(media.filename.as_deref(), Some("cb.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_each_complete_once() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    let repo = mount_home_server(&server).await;
    let config = ClientConfig::new(&server.uri()).unwrap().with_max_in_flight(3);
    let client = Client::with_config(config).unwrap();
    client.login_async(USER, PASSWORD).await.unwrap();

    let (tx, rx) = mpsc::channel();
    for i in 0..20 {
        let tx = tx.clone();
        client.upload(format!("payload {i}"), "text/plain", "n.txt", move |result| {
            tx.send((i, result)).unwrap();
        });
    }
    drop(tx);

    let results = tokio::task::spawn_blocking(move || rx.iter().collect::<Vec<_>>())
        .await
        .unwrap();
    assert_eq!(results.len(), 20);
    for (i, result) in results {
        let uri = result.unwrap_or_else(|e| panic!("upload {i} failed: {e}"));
        let stored = repo.get(uri.media_id()).unwrap();
        assert_eq!(stored.content, format!("payload {i}").into_bytes());
    }
    assert_eq!(repo.len(), 20);
    assert_eq!(client.in_flight(), 0);
}

#[tokio::test]
async fn test_download_unknown_media_is_protocol_error() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_home_server(&server).await;
    let client = client_for(&server);

    let err = client.download_async(SERVER_NAME, "missing").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.errcode(), Some("M_NOT_FOUND"));
}

#[tokio::test]
async fn test_download_does_not_require_login_by_default() {
    let Some(server) = support::start_mock_server_or_skip().await else {
        return;
    };
    mount_home_server(&server).await;
    let uploader = client_for(&server);
    uploader.login_async(USER, PASSWORD).await.unwrap();
    let uri = uploader.upload_async("shared", "text/plain", "s.txt").await.unwrap();

    let anonymous = Client::with_config(
        ClientConfig::new(&server.uri())
            .unwrap()
            .with_request_timeout(Duration::from_secs(10)),
    )
    .unwrap();
    assert!(!anonymous.is_authenticated());
    let media = anonymous.download_async(uri.authority(), uri.media_id()).await.unwrap();
    assert_eq!(media.content, b"shared");
}
