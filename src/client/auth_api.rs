use crate::api::schemas::Data;
use crate::api::schemas::auth::{AuthSession, Credentials, LogoutRequest, RefreshRequest, TokenPair};
use crate::client::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// The client's view of the auth endpoints.
///
/// Calls here never pass through the request gateway: a 401 from login or
/// refresh is a final answer, not a reason to refresh.
#[async_trait]
pub trait AuthApi: Send + Sync + fmt::Debug {
    /// # Errors
    /// Returns `ClientError::Http` with status 401 for bad credentials.
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession>;

    /// # Errors
    /// Returns `ClientError::Http` with status 409 if the username is taken.
    async fn register(&self, credentials: &Credentials) -> Result<AuthSession>;

    /// Exchanges a refresh token for a new token pair.
    ///
    /// # Errors
    /// Returns `ClientError::Http` with status 401 if the token is invalid, expired or reused.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;

    /// # Errors
    /// Returns an error if the server could not be reached or rejected the request.
    async fn logout(&self, refresh_token: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    http: Client,
    api_root: Url,
}

impl HttpAuthApi {
    #[must_use]
    pub const fn new(http: Client, api_root: Url) -> Self {
        Self { http, api_root }
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.api_root.join(path).map_err(|e| ClientError::Network { message: format!("Invalid URL: {e}") })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let response = self.http.post(self.url(path)?).json(body).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ClientError::from_response(response).await)
        }
    }

    async fn post_for<B: Serialize + Sync, T: DeserializeOwned + Send>(&self, path: &str, body: &B) -> Result<T> {
        let envelope: Data<T> = self.post(path, body).await?.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[tracing::instrument(skip(self, credentials), err(level = "debug"))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession> {
        self.post_for("auth/login", credentials).await
    }

    #[tracing::instrument(skip(self, credentials), err(level = "debug"))]
    async fn register(&self, credentials: &Credentials) -> Result<AuthSession> {
        self.post_for("auth/register", credentials).await
    }

    #[tracing::instrument(skip(self, refresh_token), err(level = "debug"))]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.post_for("auth/refresh", &RefreshRequest { refresh_token: refresh_token.to_string() }).await
    }

    #[tracing::instrument(skip(self, refresh_token), err(level = "debug"))]
    async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.post("auth/logout", &LogoutRequest { refresh_token: refresh_token.to_string() }).await?;
        Ok(())
    }
}
