//! Content identifiers (`mxc://<authority>/<media-id>`).
//!
//! Upload returns a content identifier; download takes the authority and
//! media id separately. Nothing in this module touches the network.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Scheme prefix of every content identifier issued by a home server.
pub const CONTENT_URI_PREFIX: &str = "mxc://";

/// Returns the media id of an identifier: its final `/`-separated segment.
///
/// Everything before the final separator is treated as opaque.
///
/// # Errors
///
/// Returns [`ClientError::MalformedIdentifier`] if the identifier contains no `/`.
///
/// # Example
///
/// ```
/// use mxmedia_core::media_id_of;
///
/// assert_eq!(media_id_of("mxc://localhost/AbCdEf").unwrap(), "AbCdEf");
/// assert!(media_id_of("no-separator").is_err());
/// ```
pub fn media_id_of(identifier: &str) -> Result<String, ClientError> {
    identifier
        .rsplit_once('/')
        .map(|(_, media_id)| media_id.to_string())
        .ok_or_else(|| ClientError::malformed_identifier(identifier))
}

/// A parsed content identifier: issuing server plus locally-unique media id.
///
/// Two identifiers are equal iff both components match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentUri {
    authority: String,
    media_id: String,
}

impl ContentUri {
    /// Builds an identifier from its components.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedIdentifier`] if either component is
    /// empty or the media id contains a `/`.
    pub fn new(
        authority: impl Into<String>,
        media_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let authority = authority.into();
        let media_id = media_id.into();
        if authority.is_empty() || media_id.is_empty() || media_id.contains('/') {
            return Err(ClientError::malformed_identifier(format!(
                "{CONTENT_URI_PREFIX}{authority}/{media_id}"
            )));
        }
        Ok(Self {
            authority,
            media_id,
        })
    }

    /// Parses `mxc://<authority>/<media-id>`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedIdentifier`] when the scheme is not
    /// `mxc://` or either component is missing.
    pub fn parse(identifier: &str) -> Result<Self, ClientError> {
        let rest = identifier
            .strip_prefix(CONTENT_URI_PREFIX)
            .ok_or_else(|| ClientError::malformed_identifier(identifier))?;
        let (authority, media_id) = rest
            .rsplit_once('/')
            .ok_or_else(|| ClientError::malformed_identifier(identifier))?;
        if authority.is_empty() || media_id.is_empty() {
            return Err(ClientError::malformed_identifier(identifier));
        }
        Ok(Self {
            authority: authority.to_string(),
            media_id: media_id.to_string(),
        })
    }

    /// The issuing server.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The server-assigned media id.
    #[must_use]
    pub fn media_id(&self) -> &str {
        &self.media_id
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_URI_PREFIX}{}/{}", self.authority, self.media_id)
    }
}

impl FromStr for ContentUri {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentUri {
    type Error = ClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentUri> for String {
    fn from(value: ContentUri) -> Self {
        value.to_string()
    }
}
