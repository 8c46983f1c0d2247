//! Session state: which server, who is logged in, and whether the client is closed.
//!
//! The credential is the only mutable shared state in the client. It is
//! replaced as a whole (`Arc<Credentials>`) under a lock, so a request being
//! built concurrently with a login sees either no credential or a complete one.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};
use url::Url;

use crate::error::ClientError;

/// Identity and access token obtained from a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user_id: String,
    access_token: String,
    device_id: Option<String>,
}

impl Credentials {
    /// Creates credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authentication`] when the access token is empty.
    pub fn new(
        user_id: impl Into<String>,
        access_token: impl Into<String>,
        device_id: Option<String>,
    ) -> Result<Self, ClientError> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(ClientError::authentication("empty access token"));
        }
        Ok(Self {
            user_id: user_id.into(),
            access_token,
            device_id,
        })
    }

    /// Fully-qualified user id (`@alice:example.org`).
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Opaque bearer token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Device id assigned at login, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Observable lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No credential yet.
    Unauthenticated,
    /// Logged in.
    Authenticated,
    /// Closed; every further request fails.
    Closed,
}

#[derive(Debug)]
enum SessionState {
    Unauthenticated,
    Authenticated(Arc<Credentials>),
    Closed,
}

/// One connection context between the client and one home server.
#[derive(Debug)]
pub struct Session {
    homeserver: Url,
    state: RwLock<SessionState>,
}

impl Session {
    /// Creates an unauthenticated session for `homeserver`.
    #[must_use]
    pub fn new(homeserver: Url) -> Self {
        Self {
            homeserver,
            state: RwLock::new(SessionState::Unauthenticated),
        }
    }

    /// Base URL of the home server.
    #[must_use]
    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match *self.read() {
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Closed => SessionStatus::Closed,
        }
    }

    /// Whether a login has completed and the session is still open.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status() == SessionStatus::Closed
    }

    /// Returns the current credential for building an authenticated request.
    ///
    /// # Errors
    ///
    /// - [`ClientError::SessionClosed`] after close
    /// - [`ClientError::Authentication`] before a successful login
    pub fn credentials(&self) -> Result<Arc<Credentials>, ClientError> {
        match &*self.read() {
            SessionState::Authenticated(credentials) => Ok(Arc::clone(credentials)),
            SessionState::Unauthenticated => Err(ClientError::not_logged_in()),
            SessionState::Closed => Err(ClientError::SessionClosed),
        }
    }

    /// Fails with [`ClientError::SessionClosed`] if the session is closed.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_open(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            Err(ClientError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Stores `credentials`, marking the session authenticated.
    ///
    /// A later login replaces the earlier credential.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionClosed`] if the session was closed while
    /// the login was in flight; the credential is discarded.
    pub fn authenticate(&self, credentials: Credentials) -> Result<(), ClientError> {
        let mut state = self.write();
        if matches!(*state, SessionState::Closed) {
            return Err(ClientError::SessionClosed);
        }
        info!(user_id = %credentials.user_id(), "session authenticated");
        *state = SessionState::Authenticated(Arc::new(credentials));
        Ok(())
    }

    /// Marks the session closed and drops the credential.
    ///
    /// Returns `true` on the first call, `false` when already closed.
    pub fn close(&self) -> bool {
        let mut state = self.write();
        if matches!(*state, SessionState::Closed) {
            return false;
        }
        *state = SessionState::Closed;
        debug!(homeserver = %self.homeserver, "session closed");
        true
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
