//! Wire-level protocol: endpoint paths, JSON shapes, and response classification.

pub mod login;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::dispatcher::HttpResponse;
use crate::error::ClientError;

pub use login::{LoginRequest, LoginResponse};

/// Prefix of the client-server API.
pub const CLIENT_API_PREFIX: &str = "/_matrix/client/r0";

/// Prefix of the media repository API.
pub const MEDIA_API_PREFIX: &str = "/_matrix/media/r0";

/// Error codes that mean the access token itself was missing or rejected.
const TOKEN_ERRCODES: &[&str] = &["M_MISSING_TOKEN", "M_UNKNOWN_TOKEN"];

/// Standard error body: `{"errcode": "M_...", "error": "..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[serde(default)]
    pub errcode: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Passes 2xx responses through; turns anything else into a [`ClientError`].
///
/// The message comes from the JSON error body when it parses, otherwise a
/// generic `HTTP <status>` text is used. Token rejections map to
/// [`ClientError::Authentication`].
///
/// # Errors
///
/// See above.
pub fn check_status(path: &str, response: HttpResponse) -> Result<HttpResponse, ClientError> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status.as_u16();
    let body: ErrorResponse = serde_json::from_slice(&response.body).unwrap_or_default();
    let message = body
        .error
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));

    if status == 401
        || body
            .errcode
            .as_deref()
            .is_some_and(|code| TOKEN_ERRCODES.contains(&code))
    {
        return Err(ClientError::authentication(format!(
            "{path} rejected the access token: {message}"
        )));
    }

    Err(ClientError::protocol(path, status, body.errcode, message))
}

/// Decodes a JSON response body into `T`.
///
/// # Errors
///
/// Returns [`ClientError::MalformedResponse`] when the body is not the expected shape.
pub fn decode_json<T: DeserializeOwned>(
    path: &str,
    response: &HttpResponse,
) -> Result<T, ClientError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        let content_type = response.header_str(&CONTENT_TYPE).unwrap_or("<none>");
        ClientError::malformed(
            path,
            format!("expected JSON body (content-type {content_type}): {e}"),
        )
    })
}
