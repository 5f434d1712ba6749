//! [`HttpTransport`] implementation over `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::{HttpRequest, HttpResponse, HttpTransport};
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Transport backed by a shared [`reqwest::Client`].
///
/// Created once per [`Client`](crate::Client) and reused for every request,
/// taking advantage of reqwest's connection pooling.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a transport using the timeouts from `config`.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes
    /// - Gzip decompression: enabled
    ///
    /// No User-Agent is set at this level; authenticated calls add their own.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the underlying client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .gzip(true)
            .build()
            .map_err(|e| {
                ClientError::invalid_config("transport", format!("HTTP client build failed: {e}"))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method))]
    async fn request(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let HttpRequest {
            method,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| map_send_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_send_error(url, e))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse::new(url, status, body))
    }
}

fn map_send_error(url: &str, error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::request_timeout(url)
    } else if error.is_builder() {
        ClientError::invalid_url(url)
    } else {
        ClientError::network(url, error)
    }
}
