//! The client facade: one session, one dispatcher, and the media operations.
//!
//! Every operation comes in two shapes:
//! - callback style (`login`, `upload`, `download`): returns immediately and
//!   fires the completion exactly once, possibly on another thread
//! - awaitable style (`login_async`, `upload_async`, `download_async`)
//!
//! Local pre-flight failures (not logged in, session closed, bad arguments)
//! are delivered through the completion too, so callers handle one failure path.
//!
//! # Example
//!
//! ```no_run
//! use mxmedia_core::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("localhost")?;
//! client.login_async("alice", "secret").await?;
//! let uri = client
//!     .upload_async("This is some random text", "text/plain", "doc.txt")
//!     .await?;
//! let media = client.download_async(uri.authority(), uri.media_id()).await?;
//! assert_eq!(media.content, b"This is some random text");
//! client.close();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::{ClientConfig, ConfigError};
use crate::dispatcher::{Dispatcher, ReqwestTransport, Transport, wait_for};
use crate::error::ClientError;
use crate::identifiers::ContentUri;
use crate::media::{
    MediaObject, build_download_request, build_upload_request, decode_download, decode_upload,
};
use crate::protocol::login::{classify_login_error, login_path};
use crate::protocol::{LoginRequest, LoginResponse, decode_json};
use crate::session::{Credentials, Session};

/// Display name of the device created by [`Client::login`].
pub const DEVICE_DISPLAY_NAME: &str = "mxmedia";

/// Asynchronous media client for one home server.
///
/// Cloning is cheap and every clone shares the same session. The session is
/// closed when [`close`](Self::close) is called or the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: ClientConfig,
    session: Arc<Session>,
    dispatcher: Dispatcher,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.session.close();
        self.dispatcher.close();
    }
}

impl Client {
    /// Creates a client for `homeserver` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the address is invalid or the HTTP client cannot be built.
    pub fn new(homeserver: &str) -> Result<Self, ConfigError> {
        Self::with_config(ClientConfig::new(homeserver)?)
    }

    /// Creates a client from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or the HTTP client cannot be built.
    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client that sends requests through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let dispatcher = Dispatcher::new(&config, transport)?;
        let session = Arc::new(Session::new(config.homeserver().clone()));
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                session,
                dispatcher,
            }),
        })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Whether a login has completed and the client is still open.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_authenticated()
    }

    /// The logged-in user id.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.inner
            .session
            .credentials()
            .ok()
            .map(|creds| creds.user_id().to_string())
    }

    /// The current access token.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .session
            .credentials()
            .ok()
            .map(|creds| creds.access_token().to_string())
    }

    /// Resumes a session with a token obtained elsewhere, skipping login.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the client is closed.
    pub fn set_access_token(
        &self,
        user_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.inner
            .session
            .authenticate(Credentials::new(user_id, access_token, None)?)
    }

    /// Number of requests submitted but not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.dispatcher.in_flight()
    }

    /// Logs in with a username and password.
    ///
    /// On success the returned credential is stored and later uploads use it.
    /// On failure the session stays unauthenticated. If the client is closed
    /// while the login is in flight, the completion still gets the response
    /// but the credential is not stored.
    #[instrument(skip(self, password, completion), fields(user = %username))]
    pub fn login<F>(&self, username: &str, password: &str, completion: F)
    where
        F: FnOnce(Result<LoginResponse, ClientError>) + Send + 'static,
    {
        if let Err(error) = self.inner.session.ensure_open() {
            completion(Err(error));
            return;
        }
        let request = match LoginRequest::password(username, password)
            .with_device_name(DEVICE_DISPLAY_NAME)
            .into_http()
        {
            Ok(request) => request,
            Err(error) => {
                completion(Err(error));
                return;
            }
        };

        let session = Arc::clone(&self.inner.session);
        self.inner.dispatcher.submit_with(
            request,
            |response| decode_json::<LoginResponse>(&login_path(), &response),
            move |result| {
                let result = result.map_err(classify_login_error).and_then(|login| {
                    let credentials = login.credentials()?;
                    // A login that was in flight at close still reports success,
                    // but a closed session never becomes authenticated again.
                    if session.authenticate(credentials).is_err() {
                        debug!("session closed during login; credential discarded");
                    }
                    Ok(login)
                });
                completion(result);
            },
        );
    }

    /// Uploads `content` and delivers its content identifier.
    ///
    /// Requires a completed login; otherwise fails with an authentication
    /// error without contacting the server.
    ///
    /// An empty `content_type` is sent as `application/octet-stream`, so a
    /// later download reports that type rather than an empty string. An empty
    /// `filename` is not sent and downloads back as `None`.
    #[instrument(skip(self, content, completion), fields(content_type = %content_type, filename = %filename))]
    pub fn upload<F>(
        &self,
        content: impl Into<Vec<u8>>,
        content_type: &str,
        filename: &str,
        completion: F,
    ) where
        F: FnOnce(Result<ContentUri, ClientError>) + Send + 'static,
    {
        let credentials = match self.inner.session.credentials() {
            Ok(credentials) => credentials,
            Err(error) => {
                debug!(error = %error, "upload rejected before dispatch");
                completion(Err(error));
                return;
            }
        };
        let content = content.into();
        debug!(bytes = content.len(), "uploading media");

        match build_upload_request(content, content_type, filename, credentials.access_token()) {
            Ok(request) => self.inner.dispatcher.submit_with(
                request,
                |response| decode_upload(&response),
                completion,
            ),
            Err(error) => completion(Err(error)),
        }
    }

    /// Downloads the media object `media_id` stored on `server`.
    ///
    /// `media_id` is the bare id (see [`crate::media_id_of`]), not a full identifier.
    /// Downloads are unauthenticated unless
    /// [`ClientConfig::with_authenticated_downloads`] is enabled.
    #[instrument(skip(self, completion))]
    pub fn download<F>(&self, server: &str, media_id: &str, completion: F)
    where
        F: FnOnce(Result<MediaObject, ClientError>) + Send + 'static,
    {
        let credentials = if self.inner.config.authenticated_downloads() {
            self.inner.session.credentials().map(Some)
        } else {
            self.inner.session.ensure_open().map(|()| None)
        };
        let credentials = match credentials {
            Ok(credentials) => credentials,
            Err(error) => {
                completion(Err(error));
                return;
            }
        };

        let token = credentials.as_deref().map(Credentials::access_token);
        match build_download_request(server, media_id, token) {
            Ok(request) => self.inner.dispatcher.submit_with(
                request,
                |response| Ok(decode_download(response)),
                completion,
            ),
            Err(error) => completion(Err(error)),
        }
    }

    /// Downloads the media object referenced by `uri`.
    pub fn download_uri<F>(&self, uri: &ContentUri, completion: F)
    where
        F: FnOnce(Result<MediaObject, ClientError>) + Send + 'static,
    {
        self.download(uri.authority(), uri.media_id(), completion);
    }

    /// Closes the session.
    ///
    /// Requests already submitted keep running and their completions receive
    /// the real result. Every later request fails immediately with
    /// [`ClientError::SessionClosed`]. Calling this again is a no-op.
    pub fn close(&self) {
        if self.inner.session.close() {
            let in_flight = self.inner.dispatcher.close();
            debug!(in_flight, "client closed");
        }
    }

    /// Closes the session and waits for every submitted request to complete.
    pub async fn shutdown(&self) {
        self.close();
        self.inner.dispatcher.wait_idle().await;
    }

    /// Awaitable [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Same as the completion of [`login`](Self::login).
    pub async fn login_async(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ClientError> {
        wait_for(|completion| self.login(username, password, completion)).await
    }

    /// Awaitable [`upload`](Self::upload).
    ///
    /// # Errors
    ///
    /// Same as the completion of [`upload`](Self::upload).
    pub async fn upload_async(
        &self,
        content: impl Into<Vec<u8>>,
        content_type: &str,
        filename: &str,
    ) -> Result<ContentUri, ClientError> {
        let content = content.into();
        wait_for(|completion| self.upload(content, content_type, filename, completion)).await
    }

    /// Awaitable [`download`](Self::download).
    ///
    /// # Errors
    ///
    /// Same as the completion of [`download`](Self::download).
    pub async fn download_async(
        &self,
        server: &str,
        media_id: &str,
    ) -> Result<MediaObject, ClientError> {
        wait_for(|completion| self.download(server, media_id, completion)).await
    }
}
