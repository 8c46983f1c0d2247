//! Table of in-flight requests and their completions.
//!
//! Whoever removes an entry from the table owns its completion, so each
//! completion fires exactly once: from the request task when the exchange
//! ends, or from the drop guard if that task dies first.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use reqwest::Method;

use super::transport::HttpResponse;
use crate::error::ClientError;

/// Completion stored for a raw exchange. Typed decoding is folded in by the caller.
pub(crate) type RawCompletion = Box<dyn FnOnce(Result<HttpResponse, ClientError>) + Send>;

/// One in-flight asynchronous call.
pub struct PendingRequest {
    id: u64,
    method: Method,
    path: String,
    // Mutex makes the entry Sync without requiring callers' closures to be.
    completion: Mutex<RawCompletion>,
}

impl PendingRequest {
    pub(crate) fn new(id: u64, method: Method, path: String, completion: RawCompletion) -> Self {
        Self {
            id,
            method,
            path,
            completion: Mutex::new(completion),
        }
    }

    /// Correlation id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request path, for diagnostics.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fires the completion, consuming the request.
    pub(crate) fn complete(self, result: Result<HttpResponse, ClientError>) {
        let completion = self
            .completion
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        completion(result);
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: DashMap<u64, PendingRequest>,
}

impl PendingTable {
    pub(crate) fn insert(&self, request: PendingRequest) {
        self.entries.insert(request.id, request);
    }

    /// Removes the entry, granting the caller the right to complete it.
    pub(crate) fn take(&self, id: u64) -> Option<PendingRequest> {
        self.entries.remove(&id).map(|(_, request)| request)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
