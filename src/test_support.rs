//! In-process fakes for unit tests: a scripted transport and a recording sleeper.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::ClientError;
use crate::sleeper::Sleeper;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Scripted answer for a route.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Respond with a status and body.
    Respond(u16, Bytes),
    /// Fail as if the request timed out.
    Timeout,
}

impl Reply {
    pub(crate) fn json(status: u16, body: &'static str) -> Self {
        Self::Respond(status, Bytes::from_static(body.as_bytes()))
    }

    pub(crate) fn bytes(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Respond(status, body.into())
    }
}

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// Transport answering from per-route reply queues.
///
/// Replies are consumed in order; the last one repeats forever. Unknown
/// routes answer 404.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for `method path` (path includes the endpoint prefix).
    pub(crate) fn on(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) = routes
            .iter_mut()
            .find(|route| route.method == method && route.path == path)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| &call.method == method && call.path == path)
            .count()
    }

    fn next_reply(&self, method: &Method, path: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .find(|route| &route.method == method && route.path == path)
        else {
            return Reply::bytes(404, "");
        };
        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap()
        } else {
            route.replies.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, url: &str, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let parsed = Url::parse(url).map_err(|_| ClientError::invalid_url(url))?;
        let path = parsed.path().to_string();
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.clone(),
            path: path.clone(),
            query: parsed.query().map(str::to_string),
            headers: request.headers,
            body: request.body,
        });

        match self.next_reply(&request.method, &path) {
            Reply::Respond(status, body) => Ok(HttpResponse::new(url, status, body)),
            Reply::Timeout => Err(ClientError::request_timeout(url)),
        }
    }
}

/// Sleeper that records requested durations and returns immediately.
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn recorded(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
