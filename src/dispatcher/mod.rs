//! Request dispatcher: runs HTTP exchanges concurrently and delivers each
//! result to exactly one completion.
//!
//! # Concurrency Model
//!
//! - [`Dispatcher::submit`] returns immediately; the exchange runs on its own Tokio task
//! - A semaphore permit bounds how many exchanges run at once
//! - Completions fire on the request task, not on the caller's thread
//! - Completions of independent requests are unordered
//!
//! # Completion Contract
//!
//! - transport failure → [`ErrorKind::Transport`](crate::ErrorKind::Transport)
//! - non-2xx status → [`ErrorKind::Protocol`](crate::ErrorKind::Protocol)
//!   (or `Authentication` for token rejections)
//! - undecodable 2xx body → [`ErrorKind::MalformedResponse`](crate::ErrorKind::MalformedResponse)
//!
//! # Closing
//!
//! [`Dispatcher::close`] stops accepting requests: later submissions resolve
//! with [`ClientError::SessionClosed`] right away. Requests accepted before
//! the close still run and deliver their real result, each bounded by the
//! request timeout. [`Dispatcher::wait_idle`] waits for them.

mod pending;
mod transport;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::{Notify, Semaphore, oneshot};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ClientError, TransportError};
use crate::protocol::{check_status, decode_json};

pub use pending::PendingRequest;
pub use transport::{
    HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportRequest,
};

use pending::{PendingTable, RawCompletion};

/// Issues requests against one home server and routes each response to its completion.
///
/// Cloning is cheap; clones share the same pending table and limits.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    base: Url,
    transport: Arc<dyn Transport>,
    pending: PendingTable,
    permits: Arc<Semaphore>,
    request_timeout: Duration,
    next_id: AtomicU64,
    closed: AtomicBool,
    idle: Notify,
}

impl Dispatcher {
    /// Creates a dispatcher for `config.homeserver()` sending through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    #[instrument(level = "debug", skip(config, transport), fields(homeserver = %config.homeserver()))]
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            max_in_flight = config.max_in_flight(),
            request_timeout_ms = config.request_timeout().as_millis(),
            "creating dispatcher"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                base: config.homeserver().clone(),
                transport,
                pending: PendingTable::default(),
                permits: Arc::new(Semaphore::new(config.max_in_flight())),
                request_timeout: config.request_timeout(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                idle: Notify::new(),
            }),
        })
    }

    /// Submits a request; `completion` receives the raw response once the
    /// status has been checked.
    pub fn submit<F>(&self, request: HttpRequest, completion: F)
    where
        F: FnOnce(Result<HttpResponse, ClientError>) + Send + 'static,
    {
        self.submit_with(request, Ok, completion);
    }

    /// Submits a request whose 2xx body is JSON of type `T`.
    pub fn submit_json<T, F>(&self, request: HttpRequest, completion: F)
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<T, ClientError>) + Send + 'static,
    {
        let path = request.path().to_string();
        self.submit_with(
            request,
            move |response| decode_json(&path, &response),
            completion,
        );
    }

    /// Submits a request and decodes a successful response with `decode`.
    ///
    /// `decode` runs on the completion path right before `completion`.
    pub fn submit_with<T, D, F>(&self, request: HttpRequest, decode: D, completion: F)
    where
        T: 'static,
        D: FnOnce(HttpResponse) -> Result<T, ClientError> + Send + 'static,
        F: FnOnce(Result<T, ClientError>) + Send + 'static,
    {
        let path = request.path().to_string();
        let raw: RawCompletion = Box::new(move |result| {
            completion(
                result
                    .and_then(|response| check_status(&path, response))
                    .and_then(decode),
            );
        });
        self.dispatch(request, raw);
    }

    /// Submits a request and waits for its raw response.
    ///
    /// # Errors
    ///
    /// Same as the completion of [`submit`](Self::submit).
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        wait_for(|completion| self.submit(request, completion)).await
    }

    /// Stops accepting requests.
    ///
    /// Requests already accepted keep running and complete with their real
    /// result. Idempotent. Returns how many requests were still in flight.
    pub fn close(&self) -> usize {
        let first = !self.shared.closed.swap(true, Ordering::SeqCst);
        let in_flight = self.shared.pending.len();
        if first {
            info!(in_flight, "dispatcher closed");
        }
        in_flight
    }

    /// Waits until every accepted request has fired its completion.
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a completion in between is not missed.
            let notified = self.shared.idle.notified();
            if self.shared.pending.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of requests submitted but not yet completed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.pending.len()
    }

    fn dispatch(&self, request: HttpRequest, completion: RawCompletion) {
        if self.is_closed() {
            completion(Err(ClientError::SessionClosed));
            return;
        }

        let path = request.path().to_string();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            completion(Err(ClientError::transport(
                path,
                TransportError::Request("no Tokio runtime available to run the request".into()),
            )));
            return;
        };

        let method = request.method().clone();
        let transport_request = match request.resolve(&self.shared.base) {
            Ok(resolved) => resolved,
            Err(error) => {
                completion(Err(error));
                return;
            }
        };

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.pending.insert(PendingRequest::new(
            id,
            method.clone(),
            path.clone(),
            completion,
        ));

        // close() may have landed between the check above and the insert.
        if self.is_closed() {
            if let Some(request) = self.shared.pending.take(id) {
                request.complete(Err(ClientError::SessionClosed));
                self.shared.notify_if_idle();
            }
            return;
        }

        debug!(request_id = id, %method, path = %path, "request submitted");

        let shared = Arc::clone(&self.shared);
        runtime.spawn(async move {
            let guard = CompletionGuard::new(Arc::clone(&shared), id, path.clone());
            let result = shared.exchange(&path, transport_request).await;
            guard.finish(result);
        });
    }
}

impl Shared {
    async fn exchange(
        &self,
        path: &str,
        request: TransportRequest,
    ) -> Result<HttpResponse, ClientError> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ClientError::SessionClosed)?;

        match tokio::time::timeout(self.request_timeout, self.transport.execute(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(ClientError::transport(path, error)),
            Err(_) => Err(ClientError::timeout(path)),
        }
    }

    fn complete(&self, id: u64, result: Result<HttpResponse, ClientError>) {
        match self.pending.take(id) {
            Some(request) => {
                match &result {
                    Ok(response) => debug!(
                        request_id = id,
                        status = response.status.as_u16(),
                        bytes = response.body.len(),
                        "request completed"
                    ),
                    Err(error) => debug!(request_id = id, error = %error, "request failed"),
                }
                request.complete(result);
                self.notify_if_idle();
            }
            None => debug!(request_id = id, "completion already resolved"),
        }
    }

    fn notify_if_idle(&self) {
        if self.pending.is_empty() {
            self.idle.notify_waiters();
        }
    }
}

/// Resolves the pending entry if the request task ends without reporting a result
/// (panic inside the transport or runtime shutdown).
struct CompletionGuard {
    shared: Arc<Shared>,
    id: u64,
    path: String,
    armed: bool,
}

impl CompletionGuard {
    fn new(shared: Arc<Shared>, id: u64, path: String) -> Self {
        Self {
            shared,
            id,
            path,
            armed: true,
        }
    }

    fn finish(mut self, result: Result<HttpResponse, ClientError>) {
        self.armed = false;
        self.shared.complete(self.id, result);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(request) = self.shared.pending.take(self.id) {
            warn!(request_id = self.id, path = %self.path, "request task ended without a result");
            request.complete(Err(ClientError::transport(
                self.path.clone(),
                TransportError::Request("request task aborted".into()),
            )));
            self.shared.notify_if_idle();
        }
    }
}

/// Starts an operation with a oneshot-backed completion and awaits its result.
pub(crate) async fn wait_for<T, S>(start: S) -> Result<T, ClientError>
where
    T: Send + 'static,
    S: FnOnce(Box<dyn FnOnce(Result<T, ClientError>) + Send>),
{
    let (tx, rx) = oneshot::channel();
    start(Box::new(move |result| {
        // The receiver only goes away if the awaiting future was dropped.
        let _ = tx.send(result);
    }));
    rx.await.unwrap_or(Err(ClientError::SessionClosed))
}
