//! Download: server + media id in, bytes + metadata out.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tracing::debug;

use super::filename::parse_content_disposition;
use super::{DEFAULT_CONTENT_TYPE, MediaObject};
use crate::dispatcher::{HttpRequest, HttpResponse};
use crate::error::ClientError;
use crate::protocol::MEDIA_API_PREFIX;

/// Path of the download endpoint for one media object.
///
/// Both segments are percent-encoded; `:` is kept so `host:port` authorities stay readable.
#[must_use]
pub fn download_path(server: &str, media_id: &str) -> String {
    format!(
        "{MEDIA_API_PREFIX}/download/{}/{}",
        encode_segment(server),
        encode_segment(media_id)
    )
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).replace("%3A", ":")
}

/// Builds a download request, attaching the token when one is given.
///
/// # Errors
///
/// - [`ClientError::MalformedIdentifier`] if `server` or `media_id` is empty
///   or `media_id` contains `/` (a full identifier was passed instead of its id)
/// - an authentication error if the token is not a valid header value
pub fn build_download_request(
    server: &str,
    media_id: &str,
    access_token: Option<&str>,
) -> Result<HttpRequest, ClientError> {
    if server.is_empty() || media_id.is_empty() || media_id.contains('/') {
        return Err(ClientError::malformed_identifier(format!(
            "{server}/{media_id}"
        )));
    }

    let request = HttpRequest::get(download_path(server, media_id));
    match access_token {
        Some(token) => request.bearer(token),
        None => Ok(request),
    }
}

/// Turns a successful download response into a [`MediaObject`].
///
/// The body is taken as-is. A missing `Content-Type` becomes
/// `application/octet-stream`; a missing filename stays `None`.
#[must_use]
pub fn decode_download(response: HttpResponse) -> MediaObject {
    let content_type = response
        .header_str(&CONTENT_TYPE)
        .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), ToString::to_string);
    let filename = response
        .header_str(&CONTENT_DISPOSITION)
        .and_then(parse_content_disposition);

    debug!(
        bytes = response.body.len(),
        content_type = %content_type,
        filename = ?filename,
        "decoded media download"
    );

    MediaObject {
        content: response.body,
        content_type,
        filename,
    }
}
