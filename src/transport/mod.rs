//! HTTP transport abstraction used by the client.
//!
//! The client only needs "send this request, give me status and body". The
//! [`HttpTransport`] trait captures that so the orchestration logic can be
//! driven by [`ReqwestTransport`] in production and by scripted fakes in tests.
//!
//! Transports do not retry and do not judge status codes; callers apply
//! [`HttpResponse::error_for_status`] to turn anything outside
//! {200, 201, 202} into [`ClientError::HttpStatus`].

mod http_client;

pub use http_client::ReqwestTransport;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Status codes the service uses for success.
pub const SUCCESS_STATUSES: [u16; 3] = [200, 201, 202];

/// Returns `true` when `status` is one of [`SUCCESS_STATUSES`].
#[must_use]
pub fn is_success_status(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Performs HTTP requests on behalf of the client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` to `url` and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] or [`ClientError::RequestTimeout`]
    /// when no response could be obtained. Non-success statuses are returned
    /// as ordinary responses.
    async fn request(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Request options: method, extra headers and an optional body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (defaults to GET).
    pub method: Method,
    /// Headers to send with the request.
    pub headers: HeaderMap,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::get()
    }
}

impl HttpRequest {
    /// A bodiless GET request.
    #[must_use]
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// A POST request carrying `body`.
    #[must_use]
    pub fn post(body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }

    /// Adds or replaces a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merges `defaults` underneath the headers already set on the request.
    ///
    /// Headers present on the request win over the defaults.
    #[must_use]
    pub fn with_default_headers(mut self, defaults: &HeaderMap) -> Self {
        for (name, value) in defaults {
            if !self.headers.contains_key(name) {
                self.headers.insert(name.clone(), value.clone());
            }
        }
        self
    }
}

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    url: String,
    status: u16,
    body: Bytes,
}

impl HttpResponse {
    /// Creates a response for `url`.
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// The URL the response belongs to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The HTTP status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is one of [`SUCCESS_STATUSES`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Converts a non-success response into [`ClientError::HttpStatus`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] when the status is not 200, 201 or 202.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::http_status(self.url, self.status))
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::decode(self.url.clone(), e))
    }

    /// The raw body.
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Consumes the response, returning the raw body.
    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}
