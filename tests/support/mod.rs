//! Shared utilities for integration tests: instant sleeper, scripted responders
//! and client construction against a wiremock server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ilabs_api::{Client, ClientConfig, Sleeper};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

/// User key configured on test clients.
pub const TEST_USER_KEY: &str = "test-user-key";

/// Sleeper that returns immediately and remembers what it was asked to wait.
#[derive(Debug, Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Responder that plays `templates` in order, repeating the last one.
pub struct SequenceResponder {
    request_count: Arc<AtomicUsize>,
    templates: Vec<ResponseTemplate>,
}

impl SequenceResponder {
    pub fn new(templates: Vec<ResponseTemplate>) -> Self {
        assert!(!templates.is_empty(), "at least one response is required");
        Self {
            request_count: Arc::new(AtomicUsize::new(0)),
            templates,
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.request_count.fetch_add(1, Ordering::SeqCst);
        let last = self.templates.len() - 1;
        self.templates[index.min(last)].clone()
    }
}

/// JSON status body for a task still running.
pub fn pending_status() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({"completed": false}))
}

/// JSON status body for a finished task.
pub fn completed_status(error: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(serde_json::json!({"completed": true, "error": error}))
}

/// Builds an authenticated client pointed at `server` with an instant sleeper.
pub fn client_for(server: &MockServer) -> (Client, Arc<InstantSleeper>) {
    let sleeper = Arc::new(InstantSleeper::default());
    let config = ClientConfig::new(TEST_USER_KEY).with_endpoint(format!("{}/v1", server.uri()));
    let client = Client::new(config)
        .expect("client should build")
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}

/// Number of requests the server received for `path`.
pub async fn requests_to(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
