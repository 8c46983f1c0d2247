//! Upload: raw bytes in, content identifier out.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use super::DEFAULT_CONTENT_TYPE;
use crate::dispatcher::{HttpRequest, HttpResponse};
use crate::error::ClientError;
use crate::identifiers::ContentUri;
use crate::protocol::{MEDIA_API_PREFIX, decode_json};

/// Path of the upload endpoint.
#[must_use]
pub fn upload_path() -> String {
    format!("{MEDIA_API_PREFIX}/upload")
}

/// Upload response body: `{"content_uri": "mxc://..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentUriResponse {
    /// Identifier of the stored media.
    pub content_uri: String,
}

/// Builds an authenticated upload request.
///
/// The body is `content` verbatim; `content_type` goes in the `Content-Type`
/// header and `filename` in the `filename` query parameter (omitted when empty).
///
/// # Errors
///
/// Returns an error if `content_type` or `access_token` is not a valid header value.
pub fn build_upload_request(
    content: Vec<u8>,
    content_type: &str,
    filename: &str,
    access_token: &str,
) -> Result<HttpRequest, ClientError> {
    let content_type = if content_type.is_empty() {
        DEFAULT_CONTENT_TYPE
    } else {
        content_type
    };

    let mut request = HttpRequest::post(upload_path());
    if !filename.is_empty() {
        request = request.query("filename", filename);
    }
    Ok(request
        .header(CONTENT_TYPE, content_type)?
        .bearer(access_token)?
        .body(content))
}

/// Decodes the upload response into a [`ContentUri`].
///
/// # Errors
///
/// Returns [`ClientError::MalformedResponse`] if the body is not the expected
/// JSON shape or the identifier is not `mxc://<authority>/<media-id>`.
pub fn decode_upload(response: &HttpResponse) -> Result<ContentUri, ClientError> {
    let path = upload_path();
    let body: ContentUriResponse = decode_json(&path, response)?;
    ContentUri::parse(&body.content_uri).map_err(|_| {
        ClientError::malformed(
            path,
            format!("server returned an invalid content_uri {:?}", body.content_uri),
        )
    })
}
