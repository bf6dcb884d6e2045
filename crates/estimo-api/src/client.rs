// Shared API client: default bearer token, JSON helpers, error mapping.

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use estimo_core::filters::QueryPairs;

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse, Method, Transport};

/// Raw bytes of a binary response (PDF, spreadsheet, CSV).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Thin wrapper over a [`Transport`] holding the default bearer token that
/// is attached to every request which does not carry its own.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token: RwLock::new(None),
        }
    }

    pub fn set_token(&self, token: &str) {
        *self.token.write().expect("token lock poisoned") = Some(token.to_string());
    }

    pub fn clear_token(&self) {
        *self.token.write().expect("token lock poisoned") = None;
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().expect("token lock poisoned").clone()
    }

    // ------------------------------------------------------------------
    // Core dispatch
    // ------------------------------------------------------------------

    /// Send `request`, attaching the default token when the request has none,
    /// and turn any non-2xx status into an [`ApiError`].
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.bearer.is_none() {
            request.bearer = self.token();
        }
        let method = request.method;
        let path = request.path.clone();

        let response = self.transport.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_response(response.status, &response.body);
        warn!(
            method = method.as_str(),
            path = %path,
            status = response.status,
            "request failed: {err}"
        );
        Err(err)
    }

    /// Send `request` and decode the JSON body into `T`. An empty body decodes
    /// as JSON `null`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        decode(&response.body)
    }

    /// Send `request` and discard the body.
    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    // ------------------------------------------------------------------
    // Verb helpers
    // ------------------------------------------------------------------

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::Get, path)).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: QueryPairs,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::Get, path).query(query))
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::Post, path).json(encode(body)?))
            .await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::Post, path).form(fields))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::new(Method::Put, path).json(encode(body)?))
            .await
    }

    /// POST a JSON body, ignoring whatever the server sends back.
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send_unit(ApiRequest::new(Method::Post, path).json(encode(body)?))
            .await
    }

    pub async fn put_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        self.send_unit(ApiRequest::new(Method::Put, path).json(encode(body)?))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_unit(ApiRequest::new(Method::Delete, path)).await
    }

    pub async fn download(&self, path: &str, query: QueryPairs) -> Result<Download, ApiError> {
        let response = self
            .execute(ApiRequest::new(Method::Get, path).query(query))
            .await?;
        Ok(Download {
            content_type: response.content_type,
            bytes: response.body,
        })
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let result = if body.iter().all(u8::is_ascii_whitespace) {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(body)
    };
    result.map_err(|e| ApiError::Decode(e.to_string()))
}
