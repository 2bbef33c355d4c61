//! Scripted `Transport` shared by the service and subscription tests.
//!
//! Replies are served in the order they were pushed; once the script runs
//! out every request gets an empty JSON list. All executed requests are
//! recorded so tests can assert on exactly what went over the wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use caseapi_core::{HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Default)]
struct Script {
    requests: Vec<HttpRequest>,
    replies: VecDeque<Result<HttpResponse, TransportError>>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Result<HttpResponse, TransportError>) {
        self.inner.lock().unwrap().replies.push_back(reply);
    }

    pub fn push_json(&self, status: u16, body: &str) {
        self.push(Ok(json_response(status, body)));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.inner.lock().unwrap().requests.last().cloned().expect("no request recorded")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut script = self.inner.lock().unwrap();
        script.requests.push(request);
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Ok(json_response(200, "[]")))
    }
}

#[allow(dead_code)]
pub fn json_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.to_string(),
    }
}

#[allow(dead_code)]
pub fn text_response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_string(), "text/plain".to_string())],
        body: body.to_string(),
    }
}
