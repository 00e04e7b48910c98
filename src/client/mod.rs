//! Client library for the herdbook API.
//!
//! Every call made through [`ApiClient`] carries the stored access token. When
//! the server rejects it, the client refreshes once (shared across all
//! concurrent calls) and resends; if that fails the stored session is cleared
//! and the call returns [`ClientError::SessionExpired`].

pub mod auth_api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod session;
pub mod token_store;

pub use auth_api::{AuthApi, HttpAuthApi};
pub use config::ClientConfig;
pub use coordinator::RefreshCoordinator;
pub use error::ClientError;
pub use gateway::{ApiRequest, Gateway};
pub use session::Session;
pub use token_store::{FileTokenStore, MemoryTokenStore, StoreKey, TokenStore};

use crate::api::schemas::animals::{Animal, AnimalUpdate, HealthRecord, NewAnimal, NewHealthRecord};
use crate::api::schemas::auth::{AuthSession, Credentials, UserProfile};
use crate::api::schemas::dashboard::DashboardSummary;
use crate::domain::animal::AnimalStatus;
use self::error::Result;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ApiClient {
    gateway: Gateway,
    auth_api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Builds a client over HTTP, persisting the session under
    /// `config.token_dir` when set and in memory otherwise.
    ///
    /// # Errors
    /// Returns `ClientError::Network` if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let store: Arc<dyn TokenStore> = match &config.token_dir {
            Some(dir) => Arc::new(FileTokenStore::new(dir)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        Self::with_store(config, store)
    }

    /// # Errors
    /// Returns `ClientError::Network` if the HTTP client cannot be constructed.
    pub fn with_store(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Network { message: format!("Failed to build HTTP client: {e}") })?;
        let auth_api = Arc::new(HttpAuthApi::new(http.clone(), config.api_root()));
        Ok(Self::from_parts(http, config, store, auth_api))
    }

    /// Assembles a client around a caller-supplied auth API.
    #[must_use]
    pub fn from_parts(
        http: reqwest::Client,
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        auth_api: Arc<dyn AuthApi>,
    ) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(Arc::clone(&store), Arc::clone(&auth_api)));
        let gateway = Gateway::new(http, config.api_root(), Arc::clone(&store), coordinator);
        Self { gateway, auth_api, store }
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    #[must_use]
    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    /// Signs in and persists the new session.
    ///
    /// # Errors
    /// Returns `ClientError::Http` (401) for bad credentials or `ClientError::Storage`.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let credentials = Credentials { username: username.to_string(), password: password.to_string() };
        let session = self.auth_api.login(&credentials).await?;
        self.persist(session).await
    }

    /// Creates an account and persists the new session.
    ///
    /// # Errors
    /// Returns `ClientError::Http` (409) if the username is taken or `ClientError::Storage`.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserProfile> {
        let credentials = Credentials { username: username.to_string(), password: password.to_string() };
        let session = self.auth_api.register(&credentials).await?;
        self.persist(session).await
    }

    /// Revokes the refresh token on the server when possible, then clears the
    /// local session regardless.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store.get(StoreKey::RefreshToken).await
            && let Err(e) = self.auth_api.logout(&refresh_token).await
        {
            tracing::warn!(error = %e, "Server logout failed, clearing local session anyway");
        }
        session::clear(self.store.as_ref()).await;
    }

    /// The session persisted by an earlier login, if complete.
    pub async fn restore_session(&self) -> Option<Session> {
        session::load(self.store.as_ref()).await
    }

    async fn persist(&self, auth: AuthSession) -> Result<UserProfile> {
        let session =
            Session { user: auth.user, access_token: auth.access_token, refresh_token: auth.refresh_token };
        session::save(self.store.as_ref(), &session).await?;
        Ok(session.user)
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn me(&self) -> Result<UserProfile> {
        self.gateway.send_json(ApiRequest::get("auth/me")).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn list_animals(&self, status: Option<AnimalStatus>) -> Result<Vec<Animal>> {
        let path = status.map_or_else(|| "animals".to_string(), |s| format!("animals?status={s}"));
        self.gateway.send_json(ApiRequest::get(path)).await
    }

    /// # Errors
    /// See [`Gateway::send`]; a duplicate tag is `ClientError::Http` (409).
    pub async fn create_animal(&self, animal: &NewAnimal) -> Result<Animal> {
        self.gateway.send_json(ApiRequest::post("animals", animal)?).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn get_animal(&self, id: Uuid) -> Result<Animal> {
        self.gateway.send_json(ApiRequest::get(format!("animals/{id}"))).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn update_animal(&self, id: Uuid, animal: &AnimalUpdate) -> Result<Animal> {
        self.gateway.send_json(ApiRequest::put(format!("animals/{id}"), animal)?).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn delete_animal(&self, id: Uuid) -> Result<()> {
        self.gateway.send_empty(ApiRequest::delete(format!("animals/{id}"))).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn list_health_records(&self, animal_id: Uuid) -> Result<Vec<HealthRecord>> {
        self.gateway.send_json(ApiRequest::get(format!("animals/{animal_id}/health-records"))).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn add_health_record(&self, animal_id: Uuid, record: &NewHealthRecord) -> Result<HealthRecord> {
        self.gateway.send_json(ApiRequest::post(format!("animals/{animal_id}/health-records"), record)?).await
    }

    /// # Errors
    /// See [`Gateway::send`].
    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        self.gateway.send_json(ApiRequest::get("dashboard")).await
    }
}
