#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::database::DbPool;
use crate::adapters::database::animal_repo::AnimalRepository;
use crate::adapters::database::health_record_repo::HealthRecordRepository;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::error::AppError;
use crate::services::account_service::AccountService;
use crate::services::auth_service::AuthService;
use crate::services::health_service::HealthService;
use crate::services::livestock_service::LivestockService;
use crate::workers::RefreshTokenCleanupWorker;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Applies the embedded migrations.
///
/// # Errors
/// Returns `AppError::Migration` if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Background tasks owned by the server process.
#[derive(Debug)]
pub struct Workers {
    refresh_token_cleanup: RefreshTokenCleanupWorker,
}

impl Workers {
    /// Spawns every worker; each exits once `shutdown_rx` flips to `true`.
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.refresh_token_cleanup.run(shutdown_rx))]
    }
}

/// The wired application: request-facing services, the health service for the
/// management listener, and the background workers.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    pool: Option<DbPool>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, pool: None }
    }

    #[must_use]
    pub fn with_database(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Wires repositories, services and workers. Performs no I/O.
    ///
    /// # Errors
    /// Returns `AppError::Internal` if no database pool was supplied.
    pub fn build(self) -> Result<App, AppError> {
        let pool = self.pool.ok_or_else(|| {
            tracing::error!("AppBuilder::build called without a database pool");
            AppError::Internal
        })?;

        let user_repo = UserRepository::new();
        let refresh_repo = RefreshTokenRepository::new();

        let auth_service =
            AuthService::new(self.config.auth.clone(), pool.clone(), user_repo.clone(), refresh_repo.clone());
        let account_service = AccountService::new(pool.clone(), user_repo, auth_service.clone());
        let livestock_service =
            LivestockService::new(pool.clone(), AnimalRepository::new(), HealthRecordRepository::new());
        let health_service = HealthService::new(pool.clone());

        let workers = Workers {
            refresh_token_cleanup: RefreshTokenCleanupWorker::new(
                pool,
                refresh_repo,
                self.config.workers.token_cleanup_interval_secs,
            ),
        };

        Ok(App {
            services: ServiceContainer { auth_service, account_service, livestock_service },
            health_service,
            workers,
        })
    }
}

/// Flips `shutdown_tx` to `true` on Ctrl-C or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
            () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        }

        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_default();
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());

        tracing::error!(panic.location = %location, panic.message = %payload, "Panic occurred");
    }));
}
