//! Password login (`POST /_matrix/client/r0/login`).

use std::fmt;

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use super::CLIENT_API_PREFIX;
use crate::dispatcher::HttpRequest;
use crate::error::ClientError;
use crate::session::Credentials;

/// Login type for username/password authentication.
pub const PASSWORD_LOGIN_TYPE: &str = "m.login.password";

/// Path of the login endpoint.
#[must_use]
pub fn login_path() -> String {
    format!("{CLIENT_API_PREFIX}/login")
}

/// Body of a password login request.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "type")]
    login_type: &'static str,
    user: String,
    password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_device_display_name: Option<String>,
}

impl LoginRequest {
    /// Creates a password login for `user`.
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_type: PASSWORD_LOGIN_TYPE,
            user: user.into(),
            password: password.into(),
            initial_device_display_name: None,
        }
    }

    /// Names the device the server creates for this login.
    #[must_use]
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.initial_device_display_name = Some(name.into());
        self
    }

    /// Builds the HTTP request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`]-kind error if the body cannot be encoded.
    pub fn into_http(self) -> Result<HttpRequest, ClientError> {
        let path = login_path();
        let body = serde_json::to_vec(&self)
            .map_err(|e| ClientError::malformed(path.clone(), format!("cannot encode login: {e}")))?;
        HttpRequest::post(path)
            .header(CONTENT_TYPE, "application/json")
            .map(|request| request.body(body))
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("type", &self.login_type)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Successful login response.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Fully-qualified user id.
    pub user_id: String,
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// Device id created or reused for this login.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Server name the user belongs to (older servers only).
    #[serde(default)]
    pub home_server: Option<String>,
}

impl LoginResponse {
    /// Converts the response into session credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`] if the token is empty.
    pub fn credentials(&self) -> Result<Credentials, ClientError> {
        Credentials::new(
            self.user_id.clone(),
            self.access_token.clone(),
            self.device_id.clone(),
        )
        .map_err(|_| ClientError::malformed(login_path(), "login response has an empty access_token"))
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("device_id", &self.device_id)
            .field("home_server", &self.home_server)
            .finish()
    }
}

/// Bad credentials come back as 403 `M_FORBIDDEN`; for login that is an
/// authentication failure rather than a generic protocol error.
pub(crate) fn classify_login_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Protocol {
            status: 401 | 403,
            message,
            ..
        } => ClientError::authentication(format!("login rejected: {message}")),
        other => other,
    }
}
