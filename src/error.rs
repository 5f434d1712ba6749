//! Error types for the prediction client.
//!
//! Every variant carries the context (URL, task, path) needed to explain the
//! failure without the caller having to reconstruct it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while talking to the prediction service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service answered with a status outside {200, 201, 202}.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// A single request timed out before the service answered.
    #[error("request timeout for {url}")]
    RequestTimeout {
        /// The URL that timed out.
        url: String,
    },

    /// A success response carried a body that could not be decoded.
    #[error("invalid response body from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The service reported the task as completed with an error.
    #[error("task {task_id} in domain {domain} failed: {message}")]
    TaskFailed {
        /// Prediction domain of the task.
        domain: String,
        /// Task identifier.
        task_id: String,
        /// Error message reported by the service.
        message: String,
    },

    /// The task did not complete within the allowed number of polls.
    #[error("timeout waiting for task {task_id} in domain {domain} after {attempts} polls")]
    Timeout {
        /// Prediction domain of the task.
        domain: String,
        /// Task identifier.
        task_id: String,
        /// Number of status polls performed.
        attempts: u32,
    },

    /// A configuration value was rejected.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A request URL could not be built.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// An authenticated call was attempted without a user key.
    #[error("user key is required for authenticated requests")]
    MissingUserKey,

    /// Reading local content failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a request timeout error.
    pub fn request_timeout(url: impl Into<String>) -> Self {
        Self::RequestTimeout { url: url.into() }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates a task failure error.
    pub fn task_failed(
        domain: impl Into<String>,
        task_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::TaskFailed {
            domain: domain.into(),
            task_id: task_id.into(),
            message: message.into(),
        }
    }

    /// Creates a polling timeout error.
    pub fn timeout(domain: impl Into<String>, task_id: impl Into<String>, attempts: u32) -> Self {
        Self::Timeout {
            domain: domain.into(),
            task_id: task_id.into(),
            attempts,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status code for [`ClientError::HttpStatus`].
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened while exchanging a request with the service.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. }
                | Self::Network { .. }
                | Self::RequestTimeout { .. }
                | Self::Decode { .. }
        )
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: the variants need a URL
// or path that the source errors don't carry. Use the constructors above.
