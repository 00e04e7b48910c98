//! Single-flight access-token refresh.
//!
//! However many requests are rejected at once, at most one refresh call is in
//! flight. The first caller drives it; callers that arrive while it runs are
//! queued and all receive the same outcome when it settles.

use crate::api::schemas::auth::TokenPair;
use crate::client::auth_api::AuthApi;
use crate::client::error::{ClientError, Result};
use crate::client::token_store::{StoreKey, TokenStore};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

const NO_REFRESH_TOKEN: &str = "No refresh token available";
const REFRESH_INTERRUPTED: &str = "Token refresh was interrupted";

type Waiter = oneshot::Sender<Result<String>>;

#[derive(Debug, Default)]
enum RefreshState {
    #[default]
    Idle,
    Refreshing {
        waiters: Vec<Waiter>,
    },
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<Result<String>>),
}

#[derive(Clone, Debug)]
struct Metrics {
    refresh_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            refresh_total: meter
                .u64_counter("client_token_refresh_total")
                .with_description("Token refreshes driven by the client (success/failure)")
                .build(),
        }
    }
}

#[derive(Debug)]
pub struct RefreshCoordinator {
    store: Arc<dyn TokenStore>,
    auth_api: Arc<dyn AuthApi>,
    state: Mutex<RefreshState>,
    metrics: Metrics,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, auth_api: Arc<dyn AuthApi>) -> Self {
        Self { store, auth_api, state: Mutex::new(RefreshState::Idle), metrics: Metrics::new() }
    }

    /// Returns an access token the server should accept, refreshing if needed.
    ///
    /// `rejected` is the token the server just turned down. If the store
    /// already holds a different one, a refresh finished in the meantime and
    /// that token is returned without another round trip.
    ///
    /// # Errors
    /// Returns `ClientError::SessionExpired` when no refresh token is stored,
    /// the refresh call fails, or the new tokens cannot be persisted. The
    /// store is cleared before the error is returned to any caller.
    pub async fn fresh_access_token(&self, rejected: Option<&str>) -> Result<String> {
        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Role::Follower(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { waiters: Vec::new() };
                    Role::Leader
                }
            }
        };

        match role {
            Role::Follower(rx) => {
                tracing::debug!("Token refresh in flight, waiting for its outcome");
                rx.await.unwrap_or_else(|_| Err(ClientError::session_expired(REFRESH_INTERRUPTED)))
            }
            Role::Leader => {
                let in_flight = InFlight { coordinator: self, settled: false };
                let outcome = self.refresh(rejected).await;
                in_flight.settle(&outcome);
                outcome
            }
        }
    }

    /// True while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Number of callers queued behind the in-flight refresh.
    #[must_use]
    pub fn waiting(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[tracing::instrument(skip_all, err(level = "warn"))]
    async fn refresh(&self, rejected: Option<&str>) -> Result<String> {
        if let Some(rejected) = rejected
            && let Some(current) = self.store.get(StoreKey::AccessToken).await
            && current != rejected
        {
            tracing::debug!("Access token was already replaced, skipping refresh");
            return Ok(current);
        }

        let Some(refresh_token) = self.store.get(StoreKey::RefreshToken).await else {
            return Err(self.fail(NO_REFRESH_TOKEN).await);
        };

        let pair = match self.auth_api.refresh(&refresh_token).await {
            Ok(pair) => pair,
            Err(e) => return Err(self.fail(e.message()).await),
        };

        if let Err(e) = self.persist(&pair).await {
            return Err(self.fail(e.message()).await);
        }

        self.metrics.refresh_total.add(1, &[KeyValue::new("outcome", "success")]);
        tracing::info!("Access token refreshed");
        Ok(pair.access_token)
    }

    async fn persist(&self, pair: &TokenPair) -> Result<()> {
        self.store.set(StoreKey::AccessToken, &pair.access_token).await?;
        if let Some(refresh_token) = &pair.refresh_token {
            self.store.set(StoreKey::RefreshToken, refresh_token).await?;
        }
        Ok(())
    }

    async fn fail(&self, reason: &str) -> ClientError {
        self.metrics.refresh_total.add(1, &[KeyValue::new("outcome", "failure")]);
        self.store.remove_all(&StoreKey::ALL).await;
        ClientError::session_expired(reason)
    }
}

/// Held by the caller driving a refresh. Settling releases every queued caller;
/// dropping it unsettled (the leader was cancelled) resets to `Idle` and the
/// queued callers observe an interrupted refresh.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: &Result<String>) {
        self.settled = true;
        // Waiters are released in the order they queued.
        let waiters = self.take_waiters();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        match std::mem::take(&mut *self.coordinator.lock_state()) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let waiters = self.take_waiters();
        if !waiters.is_empty() {
            tracing::warn!(waiting = waiters.len(), "Token refresh cancelled, releasing queued requests");
        }
    }
}
