//! Media repository protocol: upload and download requests and their responses.
//!
//! Media bytes are never serialized or re-encoded: the upload body is the
//! caller's buffer and the download body is handed back unchanged.

mod download;
mod filename;
mod upload;

pub use download::{build_download_request, decode_download, download_path};
pub use filename::content_disposition_for;
pub use upload::{ContentUriResponse, build_upload_request, decode_upload, upload_path};

/// Content type used when none is declared.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A downloaded media object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    /// Raw bytes, identical to what was uploaded.
    pub content: Vec<u8>,
    /// Content type declared at upload time.
    pub content_type: String,
    /// Original filename, if one was supplied at upload time.
    pub filename: Option<String>,
}
