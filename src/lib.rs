//! InnodataLabs API Client Library
//!
//! This library provides a client for the InnodataLabs prediction
//! microservices: upload a document, run a prediction task on it, wait for the
//! task to finish and download the processed result.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`client`] - Task orchestration (upload, submit, poll, cancel, download)
//! - [`transport`] - HTTP transport trait and reqwest implementation
//! - [`backoff`] - Polling schedule with truncated exponential backoff
//! - [`config`] - Credentials, endpoint and timeouts
//! - [`status`] - Task status reports
//! - [`sleeper`] - Injectable suspension between polls

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod sleeper;
pub mod status;
#[cfg(test)]
pub(crate) mod test_support;
pub mod transport;

// Re-export commonly used types
pub use backoff::{DEFAULT_MAX_POLLS, PollPolicy};
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
pub use error::ClientError;
pub use params::PredictParams;
pub use sleeper::{Sleeper, TokioSleeper};
pub use status::{StatusReport, TaskState};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
