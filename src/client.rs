//! Prediction task orchestration.
//!
//! [`Client`] drives one prediction end to end: upload the content, submit a
//! task that references it, poll the task status with truncated exponential
//! backoff, and download the processed document.
//!
//! # Cancellation
//!
//! While polling, the submitted task is held as a pending resource. Unless the
//! service reported the task as completed (with or without an error), the
//! task is cancelled exactly once before [`Client::await_completion`] returns,
//! whatever the reason polling stopped. A failed cancel is logged and never
//! replaces the error that stopped polling.
//!
//! If the [`Client::await_completion`] future is dropped mid-poll (a
//! `tokio::time::timeout`, a `select!`, Ctrl-C), the cancel is spawned on the
//! current runtime instead. [`Client::drain_cancellations`] waits for those.
//!
//! # Example
//!
//! ```no_run
//! use ilabs_api::{Client, ClientConfig, PredictParams};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(ClientConfig::new("my-user-key"))?;
//! let params = PredictParams::new().with("format", "xml");
//! let output = client
//!     .run("reference", &b"Smith J. (2001) ..."[..], Some(&params))
//!     .await?;
//! println!("{}", String::from_utf8_lossy(&output));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::backoff::PollPolicy;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::params::PredictParams;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::status::{StatusReport, TaskState};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Header carrying the user key.
const USER_KEY_HEADER: &str = "user-key";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    input_filename: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: String,
}

/// Client for the prediction microservices.
///
/// Cheap to clone; clones share the transport and the immutable configuration,
/// so concurrent [`run`](Self::run) calls on clones are independent.
#[derive(Clone)]
pub struct Client {
    endpoint: Url,
    auth_headers: Option<Arc<HeaderMap>>,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    poll_policy: PollPolicy,
    background_cancels: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.auth_headers.is_some())
            .field("poll_policy", &self.poll_policy)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client using the default reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the configuration is invalid
    /// or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client on top of a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if the configuration is invalid.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ClientError> {
        let endpoint = config.validate()?;
        let auth_headers = config
            .user_key()
            .map(|user_key| build_auth_headers(user_key, config.user_agent()))
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            endpoint,
            auth_headers,
            transport,
            sleeper: Arc::new(TokioSleeper),
            poll_policy: PollPolicy::default(),
            background_cancels: Arc::default(),
        })
    }

    /// Replaces the sleeper used between status polls.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the polling schedule.
    #[must_use]
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    /// The service endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The polling schedule.
    #[must_use]
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Checks that the endpoint is reachable. Does not require a user key.
    ///
    /// Returns the service payload as is (typically `{"ping": "pong"}`).
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response arrives or the body is not JSON.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<serde_json::Value, ClientError> {
        let url = self.url(&["ping"])?;
        let response = self
            .transport
            .request(url.as_str(), HttpRequest::get())
            .await?;
        debug!(status = response.status(), "ping answered");
        response.json()
    }

    /// Uploads content to the input document store.
    ///
    /// Returns the remote file name assigned by the service.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] on a non-success status, or another
    /// transport error if the exchange fails.
    #[instrument(skip_all)]
    pub async fn upload(&self, content: impl Into<Bytes>) -> Result<String, ClientError> {
        let content = content.into();
        debug!(bytes = content.len(), "uploading content");

        let url = self.url(&["documents", "input"])?;
        let request = HttpRequest::post(content).header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        let response = self.fetch(url, request).await?;
        let UploadResponse { input_filename } = response.json()?;

        debug!(name = %input_filename, "content uploaded");
        Ok(input_filename)
    }

    /// Reads a local file and uploads its content.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`upload`](Self::upload).
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<String, ClientError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::io(path, e))?;
        self.upload(content).await
    }

    /// Downloads a processed document from the output store.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] on a non-success status, or another
    /// transport error if the exchange fails.
    #[instrument(skip(self))]
    pub async fn download(&self, name: &str) -> Result<Bytes, ClientError> {
        let url = self.url(&["documents", "output", name])?;
        let body = self.fetch(url, HttpRequest::get()).await?.into_bytes();
        debug!(bytes = body.len(), "document downloaded");
        Ok(body)
    }

    /// Starts a prediction task for an uploaded file.
    ///
    /// `params` are appended as a query string in insertion order.
    /// Returns the task id.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] on a non-success status, or another
    /// transport error if the exchange fails.
    #[instrument(skip(self, params))]
    pub async fn submit(
        &self,
        domain: &str,
        name: &str,
        params: Option<&PredictParams>,
    ) -> Result<String, ClientError> {
        let mut url = self.url(&["reference", domain, name])?;
        if let Some(params) = params.filter(|params| !params.is_empty()) {
            url.query_pairs_mut().extend_pairs(params.iter());
        }

        let response = self.fetch(url, HttpRequest::get()).await?;
        let SubmitResponse { task_id } = response.json()?;

        debug!(task_id = %task_id, "task submitted");
        Ok(task_id)
    }

    /// Fetches the current status of a task. Performs a single request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] on a non-success status, or another
    /// transport error if the exchange fails.
    #[instrument(level = "debug", skip(self))]
    pub async fn poll_status(
        &self,
        domain: &str,
        task_id: &str,
    ) -> Result<StatusReport, ClientError> {
        let url = self.url(&["reference", domain, task_id, "status"])?;
        self.fetch(url, HttpRequest::get()).await?.json()
    }

    /// Asks the service to cancel a task. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HttpStatus`] on a non-success status, or another
    /// transport error if the exchange fails.
    #[instrument(skip(self))]
    pub async fn cancel(&self, domain: &str, task_id: &str) -> Result<(), ClientError> {
        let url = self.url(&["reference", domain, task_id, "cancel"])?;
        self.fetch(url, HttpRequest::get()).await?;
        Ok(())
    }

    /// Waits until the service reports the task as completed.
    ///
    /// Sleeps before every poll following the configured [`PollPolicy`].
    /// Cancels the task once if polling stops before a completed status was
    /// observed.
    ///
    /// # Errors
    ///
    /// - [`ClientError::TaskFailed`] if the service reports an error
    /// - [`ClientError::Timeout`] if the poll budget runs out
    /// - any transport error raised by a status poll
    #[instrument(skip(self))]
    pub async fn await_completion(&self, domain: &str, task_id: &str) -> Result<(), ClientError> {
        let mut pending = PendingTask::new(self, domain, task_id);
        let outcome = self
            .poll_until_completed(domain, task_id, &mut pending)
            .await;
        pending.release().await;
        outcome
    }

    /// Waits for cancels spawned by dropped [`await_completion`](Self::await_completion)
    /// futures, on this client and its clones.
    pub async fn drain_cancellations(&self) {
        let handles = std::mem::take(
            &mut *self
                .background_cancels
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(error) = handle.await {
                warn!(error = %error, "background cancel did not finish");
            }
        }
    }

    async fn poll_until_completed(
        &self,
        domain: &str,
        task_id: &str,
        pending: &mut PendingTask,
    ) -> Result<(), ClientError> {
        let mut attempts = 0;

        for delay in self.poll_policy.delays() {
            self.sleeper.sleep(delay).await;
            attempts += 1;

            let report = self.poll_status(domain, task_id).await?;
            pending.observe(&report);

            match report.state() {
                TaskState::Succeeded => {
                    debug!(attempts, "task completed");
                    return Ok(());
                }
                TaskState::Failed(message) => {
                    warn!(attempts, error = %message, "task failed");
                    return Err(ClientError::task_failed(domain, task_id, message));
                }
                TaskState::Pending => {
                    debug!(
                        attempts,
                        waited_ms = delay.as_millis(),
                        "task still pending"
                    );
                }
            }
        }

        warn!(attempts, "task did not complete in time");
        Err(ClientError::timeout(domain, task_id, attempts))
    }

    /// Runs a prediction: upload, submit, wait, download.
    ///
    /// Returns the processed content. Failures from any stage are returned
    /// unchanged; nothing is retried across stages.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage.
    #[instrument(skip(self, content, params))]
    pub async fn run(
        &self,
        domain: &str,
        content: impl Into<Bytes>,
        params: Option<&PredictParams>,
    ) -> Result<Bytes, ClientError> {
        let name = self.upload(content).await?;
        let task_id = self.submit(domain, &name, params).await?;
        self.await_completion(domain, &task_id).await?;
        let output = self.download(&name).await?;

        info!(name = %name, task_id = %task_id, bytes = output.len(), "prediction complete");
        Ok(output)
    }

    /// Sends an authenticated request and rejects non-success statuses.
    async fn fetch(&self, url: Url, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let auth_headers = self
            .auth_headers
            .as_deref()
            .ok_or(ClientError::MissingUserKey)?;
        let request = request.with_default_headers(auth_headers);

        debug!(method = %request.method, url = %url, "sending request");
        self.transport
            .request(url.as_str(), request)
            .await?
            .error_for_status()
    }

    /// Joins path segments onto the endpoint, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::invalid_url(self.endpoint.as_str()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// A submitted task that has not been observed in a terminal state.
///
/// [`release`](Self::release) is awaited on every normal exit of the polling
/// loop. If the guard is dropped while still armed, the cancel is spawned on
/// the current runtime and tracked by the client.
struct PendingTask {
    client: Client,
    domain: String,
    task_id: String,
    armed: bool,
}

impl PendingTask {
    fn new(client: &Client, domain: &str, task_id: &str) -> Self {
        Self {
            client: client.clone(),
            domain: domain.to_string(),
            task_id: task_id.to_string(),
            armed: true,
        }
    }

    fn observe(&mut self, report: &StatusReport) {
        self.armed = !report.completed;
    }

    async fn release(mut self) {
        if std::mem::replace(&mut self.armed, false) {
            cancel_pending(&self.client, &self.domain, &self.task_id).await;
        }
    }
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                domain = %self.domain,
                task_id = %self.task_id,
                "no runtime to cancel abandoned task"
            );
            return;
        };

        debug!(task_id = %self.task_id, "polling abandoned; cancelling in background");
        let client = self.client.clone();
        let domain = std::mem::take(&mut self.domain);
        let task_id = std::mem::take(&mut self.task_id);
        let handle = runtime.spawn(async move {
            cancel_pending(&client, &domain, &task_id).await;
        });

        let mut handles = self
            .client
            .background_cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }
}

async fn cancel_pending(client: &Client, domain: &str, task_id: &str) {
    match client.cancel(domain, task_id).await {
        Ok(()) => info!(domain, task_id, "task cancelled"),
        Err(error) => warn!(
            domain,
            task_id,
            error = %error,
            "failed to cancel task; keeping original error"
        ),
    }
}

fn build_auth_headers(user_key: &str, user_agent: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(USER_KEY_HEADER),
        HeaderValue::from_str(user_key)
            .map_err(|_| ClientError::invalid_config("user_key", "not a valid header value"))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|_| ClientError::invalid_config("user_agent", "not a valid header value"))?,
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(headers)
}
