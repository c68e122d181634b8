//! Scripted transport for tests

use crate::error::{Result, TranscriptError};
use crate::slack::transport::{HttpResponse, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A request observed by [`MockTransport`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays queued responses per endpoint, in order, and records every request
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, endpoint: &str, response: HttpResponse) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a 200 response with a JSON body
    pub fn push_json(&self, endpoint: &str, body: Value) -> &Self {
        self.push(endpoint, HttpResponse::ok(body.to_string()))
    }

    /// Queue an HTTP 429 with an optional `Retry-After`
    pub fn push_throttled(&self, endpoint: &str, retry_after: Option<Duration>) -> &Self {
        self.push(
            endpoint,
            HttpResponse {
                status: 429,
                retry_after,
                body: String::new(),
            },
        )
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn requests_for(&self, endpoint: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint == endpoint)
            .collect()
    }

    /// Responses queued but never consumed
    pub fn pending(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(VecDeque::len)
            .sum()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                endpoint: endpoint.to_string(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                at: Instant::now(),
            });

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| TranscriptError::invalid_response(endpoint, "no scripted response"))
    }
}
