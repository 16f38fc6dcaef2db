//! Scripted in-memory backend for exercising the client without a network.

use crate::client::{HttpMethod, Transport, TransportError, TransportRequest, TransportResponse};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Respond(TransportResponse),
    Fail(String),
}

#[derive(Default)]
struct Script {
    routes: HashMap<(HttpMethod, String), VecDeque<Reply>>,
    calls: Vec<TransportRequest>,
}

/// Replies are queued per `(method, path)`. Each call consumes the head of
/// its queue; the last reply is sticky and answers every later call.
/// Unscripted routes answer 404.
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    latency: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.lock()
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> &Self {
        self.reply_raw(method, path, status, &body.to_string())
    }

    pub fn reply_raw(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.push(
            method,
            path,
            Reply::Respond(TransportResponse {
                status,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn fail(&self, method: HttpMethod, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::Fail(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: HttpMethod, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn next_reply(&self, request: TransportRequest) -> Reply {
        let mut script = self.lock();
        let route = (request.method, request.path.clone());
        script.calls.push(request);
        match script.routes.get_mut(&route) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| not_scripted(&route)),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| not_scripted(&route)),
            None => not_scripted(&route),
        }
    }
}

fn not_scripted((method, path): &(HttpMethod, String)) -> Reply {
    Reply::Respond(TransportResponse {
        status: 404,
        body: serde_json::json!({ "message": format!("no reply scripted for {method} {path}") }).to_string(),
    })
}

impl Transport for MockBackend {
    fn perform(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        async move {
            let reply = self.next_reply(request);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            match reply {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(message) => Err(TransportError(message)),
            }
        }
    }
}
