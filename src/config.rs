//! Client configuration (home server, timeouts, concurrency, download policy).

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::user_agent;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default bound on a whole request, response body included (5 minutes for large media).
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default number of requests allowed in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

const MIN_IN_FLIGHT: usize = 1;
const MAX_IN_FLIGHT: usize = 100;
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Errors raised while building or validating a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The home server address could not be parsed.
    #[error("invalid home server address {value:?}: {reason}")]
    InvalidHomeserver {
        /// The address as supplied.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The in-flight limit is outside `1..=100`.
    #[error(
        "invalid max_in_flight value {value}: must be between {MIN_IN_FLIGHT} and {MAX_IN_FLIGHT}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// A timeout is zero or longer than an hour.
    #[error("invalid {field}: {secs}s (expected 1..={MAX_TIMEOUT_SECS} seconds)")]
    InvalidTimeout {
        /// Which timeout.
        field: &'static str,
        /// The rejected value in seconds.
        secs: u64,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Settings for a [`crate::Client`].
///
/// # Example
///
/// ```
/// use mxmedia_core::ClientConfig;
///
/// let config = ClientConfig::new("localhost").unwrap().with_max_in_flight(4);
/// assert_eq!(config.homeserver().as_str(), "https://localhost/");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    homeserver: Url,
    connect_timeout: Duration,
    request_timeout: Duration,
    max_in_flight: usize,
    authenticated_downloads: bool,
    user_agent: String,
}

impl ClientConfig {
    /// Creates a config for the given home server with default settings.
    ///
    /// A bare host (`localhost`, `example.org:8448`) is taken to mean `https://<host>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHomeserver`] if the address is not an
    /// `http`/`https` URL with a host.
    pub fn new(homeserver: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            homeserver: parse_homeserver(homeserver)?,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            authenticated_downloads: false,
            user_agent: user_agent::default_user_agent(),
        })
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the overall per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how many requests may be in flight at once.
    #[must_use]
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Attach the access token to downloads and require a login before downloading.
    #[must_use]
    pub fn with_authenticated_downloads(mut self, enabled: bool) -> Self {
        self.authenticated_downloads = enabled;
        self
    }

    /// Overrides the User-Agent header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_IN_FLIGHT..=MAX_IN_FLIGHT).contains(&self.max_in_flight) {
            return Err(ConfigError::InvalidConcurrency {
                value: self.max_in_flight,
            });
        }
        validate_timeout("connect_timeout", self.connect_timeout)?;
        validate_timeout("request_timeout", self.request_timeout)?;
        Ok(())
    }

    /// Base URL of the home server.
    #[must_use]
    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Overall per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Maximum number of concurrent in-flight requests.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Whether downloads carry the access token.
    #[must_use]
    pub fn authenticated_downloads(&self) -> bool {
        self.authenticated_downloads
    }

    /// User-Agent header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

fn parse_homeserver(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| ConfigError::InvalidHomeserver {
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidHomeserver {
            value: raw.to_string(),
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidHomeserver {
            value: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

fn validate_timeout(field: &'static str, timeout: Duration) -> Result<(), ConfigError> {
    let secs = timeout.as_secs();
    if timeout.is_zero() || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::InvalidTimeout { field, secs });
    }
    Ok(())
}
