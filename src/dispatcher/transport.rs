//! HTTP request/response shapes and the transport seam.
//!
//! The dispatcher never talks to sockets itself: it hands a fully-resolved
//! [`TransportRequest`] to a [`Transport`] and gets back status, headers and
//! raw body bytes. [`ReqwestTransport`] is the production implementation.

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::{ClientError, TransportError};

/// A request relative to the home server base URL.
#[derive(Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HttpRequest {
    /// Creates a request with an empty body.
    ///
    /// `path` must already be percent-encoded; query values are encoded when
    /// the URL is resolved.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a header.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`]-kind error if `value` contains
    /// bytes that are not valid in a header.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            ClientError::malformed(self.path.clone(), format!("invalid {name} header value"))
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Attaches `Authorization: Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authentication`] if the token cannot be sent as a header.
    pub fn bearer(mut self, token: &str) -> Result<Self, ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::authentication("access token is not a valid header value"))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Sets the raw body. The bytes are sent verbatim.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the home server base URL.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Joins this request onto `base`, producing something a [`Transport`] can send.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`]-kind error if the joined URL is invalid.
    pub fn resolve(self, base: &Url) -> Result<TransportRequest, ClientError> {
        let joined = format!("{}{}", base.as_str().trim_end_matches('/'), self.path);
        let mut url = Url::parse(&joined)
            .map_err(|e| ClientError::malformed(self.path.clone(), format!("invalid URL: {e}")))?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(TransportRequest {
            method: self.method,
            url,
            headers: self.headers,
            body: self.body,
        })
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// A request with an absolute URL, ready to send.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: Url,
    /// Headers to send.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Vec<u8>,
}

/// Status, headers and raw body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body bytes, untouched.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns a header as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header_str(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Something that can perform one HTTP exchange asynchronously.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends `request` and returns the full response.
    async fn execute(&self, request: TransportRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport using the timeouts and User-Agent from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if reqwest rejects the configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, url = %request.url.path()))]
    async fn execute(&self, request: TransportRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?
            .to_vec();

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(HttpResponse::new(status, headers, body))
    }
}
