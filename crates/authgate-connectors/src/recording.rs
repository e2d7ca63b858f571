//! In-memory transport that replays scripted replies and records requests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use authgate_api::{GuardError, Method, Transport, TransportRequest, TransportResponse};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Reply {
    Respond(TransportResponse),
    Fail(String),
}

impl Reply {
    fn to_result(&self) -> Result<TransportResponse, GuardError> {
        match self {
            Reply::Respond(resp) => Ok(resp.clone()),
            Reply::Fail(msg) => Err(GuardError::Transport(msg.clone())),
        }
    }
}

/// Scripted transport for tests.
///
/// Replies are queued per method and path; the last reply for a route is
/// repeated once the queue is down to it. Unscripted routes fail with a
/// transport error.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    replies: Mutex<BTreeMap<(String, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn respond(&self, method: Method, path: &str, response: TransportResponse) -> &Self {
        self.push(method, path, Reply::Respond(response));
        self
    }

    /// Queue a 200 response with `data`.
    pub fn ok(&self, method: Method, path: &str, data: Value) -> &Self {
        self.respond(method, path, TransportResponse::ok(data))
    }

    /// Queue a network-level failure.
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::Fail(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests seen so far as `"METHOD /path"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, GuardError> {
        let key = (request.method.to_string(), request.path.clone());
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(queue) = replies.get_mut(&key) else {
            return Err(GuardError::Transport(format!(
                "no reply scripted for {} {}",
                key.0, key.1
            )));
        };
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(reply) => reply.to_result(),
            None => Err(GuardError::Transport(format!(
                "no reply scripted for {} {}",
                key.0, key.1
            ))),
        }
    }
}
