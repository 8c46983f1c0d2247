//! Mxmedia Core Library
//!
//! Asynchronous media transfer for federated messaging home servers: log in,
//! upload arbitrary bytes to get a content identifier, and download that
//! identifier back into the original bytes plus their content type and filename.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`identifiers`] - Content identifier (`mxc://`) parsing
//! - [`error`] - The `ClientError` taxonomy every completion reports
//! - [`session`] - Credential and lifecycle state
//! - [`dispatcher`] - Concurrent request execution with exactly-once completions
//! - [`protocol`] - Endpoint paths, JSON shapes, status classification, login
//! - [`media`] - Upload and download request builders and decoders
//! - [`client`] - The `Client` facade
//! - [`config`] - Client configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod identifiers;
pub mod media;
pub mod protocol;
pub mod session;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use client::Client;
pub use config::{
    CONNECT_TIMEOUT_SECS, ClientConfig, ConfigError, DEFAULT_MAX_IN_FLIGHT, REQUEST_TIMEOUT_SECS,
};
pub use dispatcher::{
    Dispatcher, HttpRequest, HttpResponse, PendingRequest, ReqwestTransport, Transport,
    TransportRequest,
};
pub use error::{BoxError, ClientError, ErrorKind, TransportError};
pub use identifiers::{CONTENT_URI_PREFIX, ContentUri, media_id_of};
pub use media::{DEFAULT_CONTENT_TYPE, MediaObject};
pub use protocol::{LoginRequest, LoginResponse};
pub use session::{Credentials, Session, SessionStatus};
