// Scripted transport for exercising stores without a server.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Replays queued responses in order and records every request it receives.
/// Once the queue is empty every call fails with a transport error.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, ApiError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: ApiResponse) -> &Self {
        self.responses
            .lock()
            .expect("mock transport mutex poisoned")
            .push_back(Ok(response));
        self
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(ApiResponse::json(status, &body))
    }

    pub fn push_ok(&self, body: Value) -> &Self {
        self.push_json(200, body)
    }

    pub fn push_no_content(&self) -> &Self {
        self.push(ApiResponse::no_content())
    }

    pub fn push_bytes(&self, content_type: &str, bytes: &[u8]) -> &Self {
        self.push(ApiResponse {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: bytes.to_vec(),
        })
    }

    pub fn push_error(&self, error: ApiError) -> &Self {
        self.responses
            .lock()
            .expect("mock transport mutex poisoned")
            .push_back(Err(error));
        self
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .expect("mock transport mutex poisoned")
            .clone()
    }

    /// `"METHOD /path"` for each request, handy for asserting call order.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method.as_str(), r.path))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .expect("mock transport mutex poisoned")
            .len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let summary = format!("{} {}", request.method.as_str(), request.path);
        self.requests
            .lock()
            .expect("mock transport mutex poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("mock transport mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport(format!("no scripted response for {summary}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiRequest, Method};
    use serde_json::json;

    #[tokio::test]
    async fn replays_scripted_errors_and_drains_queue() {
        let mock = MockTransport::new();
        mock.push_error(ApiError::Transport("connection reset".into()))
            .push_ok(json!({"ok": true}));
        assert_eq!(mock.remaining(), 2);

        let err = mock
            .send(ApiRequest::new(Method::Get, "/estimates"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref msg) if msg == "connection reset"));
        assert_eq!(mock.remaining(), 1);

        let response = mock
            .send(ApiRequest::new(Method::Get, "/estimates"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(mock.remaining(), 0);

        let err = mock
            .send(ApiRequest::new(Method::Delete, "/clients/1"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DELETE /clients/1"));
        assert_eq!(mock.calls().len(), 3);
    }
}
