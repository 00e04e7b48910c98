use crate::api::schemas::Data;
use crate::client::coordinator::RefreshCoordinator;
use crate::client::error::{ClientError, Result};
use crate::client::token_store::{StoreKey, TokenStore};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const RETRY_REJECTED: &str = "Session expired, please sign in again";

/// An outbound API call. `retried` marks a request that has already been
/// resent once after a refresh and must not be resent again.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, retried: false }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// # Errors
    /// Returns `ClientError::Decode` if the body cannot be serialized.
    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        Self::new(Method::POST, path).with_json(body)
    }

    /// # Errors
    /// Returns `ClientError::Decode` if the body cannot be serialized.
    pub fn put(path: impl Into<String>, body: &impl Serialize) -> Result<Self> {
        Self::new(Method::PUT, path).with_json(body)
    }

    /// # Errors
    /// Returns `ClientError::Decode` if the body cannot be serialized.
    pub fn with_json(mut self, body: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode { message: e.to_string() })?;
        self.body = Some(value);
        Ok(self)
    }

    #[must_use]
    pub const fn is_retried(&self) -> bool {
        self.retried
    }
}

/// Sends authenticated requests and recovers from an expired access token by
/// refreshing once and resending.
#[derive(Debug, Clone)]
pub struct Gateway {
    http: Client,
    api_root: Url,
    store: Arc<dyn TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl Gateway {
    #[must_use]
    pub const fn new(
        http: Client,
        api_root: Url,
        store: Arc<dyn TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self { http, api_root, store, coordinator }
    }

    /// Sends the request and returns the successful response.
    ///
    /// # Errors
    /// - `ClientError::SessionExpired` if the refresh failed or the resent
    ///   request was rejected again. The token store is empty afterwards.
    /// - `ClientError::Http` for any other non-success status.
    /// - `ClientError::Network` if the server could not be reached in time.
    #[tracing::instrument(
        skip(self, request),
        fields(method = %request.method, path = %request.path),
        err(level = "debug")
    )]
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response> {
        let mut token = self.store.get(StoreKey::AccessToken).await;

        loop {
            let response = self.dispatch(&request, token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return ensure_success(response).await;
            }

            if request.retried {
                tracing::warn!("Request rejected again after token refresh, ending session");
                self.store.remove_all(&StoreKey::ALL).await;
                return Err(ClientError::session_expired(RETRY_REJECTED));
            }

            tracing::debug!("Access token rejected, refreshing");
            request.retried = true;
            token = Some(self.coordinator.fresh_access_token(token.as_deref()).await?);
        }
    }

    /// Sends the request and unwraps the `data` envelope of the response.
    ///
    /// # Errors
    /// As [`Gateway::send`], plus `ClientError::Decode` for an unexpected body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let envelope: Data<T> = self.send(request).await?.json().await?;
        Ok(envelope.data)
    }

    /// Sends the request and discards the response body.
    ///
    /// # Errors
    /// As [`Gateway::send`].
    pub async fn send_empty(&self, request: ApiRequest) -> Result<()> {
        self.send(request).await.map(drop)
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let url = self
            .api_root
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| ClientError::Network { message: format!("Invalid URL: {e}") })?;

        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::from_response(response).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::post("animals", &serde_json::json!({ "tag": "A1" })).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.as_ref().unwrap()["tag"], "A1");
        assert!(!request.is_retried());

        let request = ApiRequest::delete("/animals/1");
        assert_eq!(request.method, Method::DELETE);
        assert!(request.body.is_none());
    }
}
