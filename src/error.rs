//! Error types shared by every client operation.
//!
//! Every asynchronous operation completes with `Result<T, ClientError>`.
//! [`ClientError::kind`] collapses the variants into the small taxonomy
//! callers usually branch on.

use thiserror::Error;

/// Boxed error used at the transport seam so fakes and real clients can share one type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never reached server logic (connect, TLS, timeout).
    Transport,
    /// Missing or rejected credential, including local pre-flight rejection.
    Authentication,
    /// The server answered with a well-formed error response.
    Protocol,
    /// The server answered, but the body could not be decoded into the expected shape.
    MalformedResponse,
    /// The session was closed before or while the request was pending.
    SessionClosed,
}

/// Failure of the transport collaborator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response arrived within the configured bound.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established (DNS, refused, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    /// Any other failure while sending the request or reading the response body.
    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl TransportError {
    /// Maps a reqwest error onto the transport taxonomy.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(Box::new(error))
        } else {
            Self::Request(Box::new(error))
        }
    }
}

/// Errors delivered to operation completions.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure; the server's logic was never reached.
    #[error("transport error on {path}: {source}")]
    Transport {
        /// Request path that failed.
        path: String,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// Authentication required or rejected.
    #[error("[AUTH] {message}")]
    Authentication {
        /// Human-readable reason.
        message: String,
    },

    /// The server returned a well-formed error response.
    #[error("HTTP {status} from {path}: {message}")]
    Protocol {
        /// Request path that failed.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Protocol error code (`M_FORBIDDEN`, `M_TOO_LARGE`, ...) when the body carried one.
        errcode: Option<String>,
        /// Server-supplied message, or a generic one when the body was not parseable.
        message: String,
    },

    /// The response arrived but could not be decoded.
    #[error("malformed response from {path}: {message}")]
    MalformedResponse {
        /// Request path whose response was malformed.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// A content identifier string did not have the expected shape.
    #[error("malformed content identifier: {identifier:?}")]
    MalformedIdentifier {
        /// The offending identifier.
        identifier: String,
    },

    /// The session was closed.
    #[error("session closed")]
    SessionClosed,
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(path: impl Into<String>, source: TransportError) -> Self {
        Self::Transport {
            path: path.into(),
            source,
        }
    }

    /// Creates a transport timeout error.
    pub fn timeout(path: impl Into<String>) -> Self {
        Self::transport(path, TransportError::Timeout)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// The pre-flight rejection used when an operation needs a login first.
    #[must_use]
    pub fn not_logged_in() -> Self {
        Self::authentication("not logged in: call login() before this operation")
    }

    /// Creates a protocol error.
    pub fn protocol(
        path: impl Into<String>,
        status: u16,
        errcode: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Protocol {
            path: path.into(),
            status,
            errcode,
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed-identifier error.
    pub fn malformed_identifier(identifier: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::MalformedResponse { .. } | Self::MalformedIdentifier { .. } => {
                ErrorKind::MalformedResponse
            }
            Self::SessionClosed => ErrorKind::SessionClosed,
        }
    }

    /// Returns the protocol error code, if the server supplied one.
    #[must_use]
    pub fn errcode(&self) -> Option<&str> {
        match self {
            Self::Protocol { errcode, .. } => errcode.as_deref(),
            _ => None,
        }
    }

    /// Returns the HTTP status for protocol errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// No `From<reqwest::Error>` / `From<serde_json::Error>`: every variant needs
// the request path, which the source errors do not carry.
