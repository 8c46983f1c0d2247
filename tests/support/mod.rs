//! Shared helpers for integration tests: socket guard and a mock home server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::TcpListener;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mxmedia_core::media::content_disposition_for;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";
pub const ACCESS_TOKEN: &str = "syt_alice_token";
pub const SERVER_NAME: &str = "localhost";

#[must_use]
pub fn socket_tests_required() -> bool {
    std::env::var("MXMEDIA_REQUIRE_SOCKET_TESTS")
        .ok()
        .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
}

#[track_caller]
#[must_use]
pub fn should_skip_socket_bound_test() -> bool {
    if TcpListener::bind("127.0.0.1:0").is_ok() {
        return false;
    }

    let location = Location::caller();
    let message = format!(
        "[socket-bound-test] cannot bind localhost socket at {}:{}; wiremock-based test cannot run in this environment",
        location.file(),
        location.line()
    );
    if socket_tests_required() {
        panic!("{message}. Set MXMEDIA_REQUIRE_SOCKET_TESTS=0 to allow local skip behavior.");
    }

    eprintln!(
        "{message}. Skipping test. Set MXMEDIA_REQUIRE_SOCKET_TESTS=1 to fail-fast instead."
    );
    true
}

pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if should_skip_socket_bound_test() {
        None
    } else {
        Some(MockServer::start().await)
    }
}

/// One stored upload.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    pub content: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

/// In-memory media repository behind the upload and download mocks.
#[derive(Debug, Clone, Default)]
pub struct MediaRepo {
    objects: Arc<Mutex<HashMap<String, StoredMedia>>>,
    next_id: Arc<AtomicUsize>,
}

impl MediaRepo {
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn get(&self, media_id: &str) -> Option<StoredMedia> {
        self.objects.lock().unwrap().get(media_id).cloned()
    }
}

struct UploadResponder(MediaRepo);

impl Respond for UploadResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let content_type = request
            .headers
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let filename = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "filename")
            .map(|(_, value)| value.into_owned());

        let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
        let media_id = format!("Media{id:04}xYz");
        self.0.objects.lock().unwrap().insert(
            media_id.clone(),
            StoredMedia {
                content: request.body.clone(),
                content_type,
                filename,
            },
        );
        ResponseTemplate::new(200)
            .set_body_json(json!({ "content_uri": format!("mxc://{SERVER_NAME}/{media_id}") }))
    }
}

struct DownloadResponder(MediaRepo);

impl Respond for DownloadResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let media_id = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        let Some(stored) = self.0.get(&media_id) else {
            return ResponseTemplate::new(404)
                .set_body_json(json!({ "errcode": "M_NOT_FOUND", "error": "Not found" }));
        };

        let mut response = ResponseTemplate::new(200).set_body_raw(stored.content, &stored.content_type);
        if let Some(filename) = stored.filename {
            response = response.insert_header(
                "Content-Disposition",
                content_disposition_for(&filename).as_str(),
            );
        }
        response
    }
}

/// Mounts the password login endpoint for [`USER`]/[`PASSWORD`].
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/_matrix/client/r0/login"))
        .and(body_partial_json(json!({
            "type": "m.login.password",
            "user": USER,
            "password": PASSWORD,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": format!("@{USER}:{SERVER_NAME}"),
            "access_token": ACCESS_TOKEN,
            "device_id": "TESTDEVICE",
            "home_server": SERVER_NAME,
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_matrix/client/r0/login"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errcode": "M_FORBIDDEN",
            "error": "Invalid username or password",
        })))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Mounts login, upload and download endpoints sharing one [`MediaRepo`].
pub async fn mount_home_server(server: &MockServer) -> MediaRepo {
    let repo = MediaRepo::default();
    mount_login(server).await;

    Mock::given(method("POST"))
        .and(path("/_matrix/media/r0/upload"))
        .and(wiremock::matchers::header(
            "Authorization",
            format!("Bearer {ACCESS_TOKEN}").as_str(),
        ))
        .respond_with(UploadResponder(repo.clone()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/_matrix/media/r0/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errcode": "M_UNKNOWN_TOKEN",
            "error": "Unrecognised access token",
        })))
        .with_priority(10)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/_matrix/media/r0/download/[^/]+/[^/]+$"))
        .respond_with(DownloadResponder(repo.clone()))
        .mount(server)
        .await;

    repo
}
