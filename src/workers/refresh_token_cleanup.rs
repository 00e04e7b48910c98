use crate::adapters::database::DbPool;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::error::Result;
use opentelemetry::{global, metrics::Counter};
use std::time::Duration;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    purged_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            purged_total: meter
                .u64_counter("refresh_tokens_purged_total")
                .with_description("Expired refresh tokens removed by the cleanup worker")
                .build(),
        }
    }
}

/// Purges refresh tokens whose expiry has passed.
#[derive(Debug)]
pub struct RefreshTokenCleanupWorker {
    pool: DbPool,
    repo: RefreshTokenRepository,
    interval: Duration,
    metrics: Metrics,
}

impl RefreshTokenCleanupWorker {
    #[must_use]
    pub fn new(pool: DbPool, repo: RefreshTokenRepository, cleanup_interval_secs: u64) -> Self {
        Self { pool, repo, interval: Duration::from_secs(cleanup_interval_secs), metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if self.interval.is_zero() {
            tracing::info!("Refresh token cleanup is disabled (interval = 0)");
            return;
        }

        let mut interval = tokio::time::interval(self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.perform_cleanup()
                        .instrument(tracing::info_span!("run_refresh_token_cleanup"))
                        .await
                    {
                        tracing::error!(error = ?e, "Refresh token cleanup iteration failed");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Refresh token cleanup loop shutting down...");
    }

    /// Deletes every expired refresh token and returns how many were removed.
    ///
    /// # Errors
    /// Returns an error if the database connection or query fails.
    #[tracing::instrument(skip(self), err, fields(expired_deleted = tracing::field::Empty))]
    pub async fn perform_cleanup(&self) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        let count = self.repo.delete_expired(&mut conn).await?;

        if count > 0 {
            tracing::info!(count = %count, "Deleted expired refresh tokens");
            tracing::Span::current().record("expired_deleted", count);
            self.metrics.purged_total.add(count, &[]);
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::init_pool;
    use crate::adapters::database::user_repo::UserRepository;
    use crate::config::DatabaseConfig;

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_tokens() {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        })
        .await
        .unwrap();
        crate::run_migrations(&pool).await.unwrap();

        let repo = RefreshTokenRepository::new();
        let mut conn = pool.acquire().await.unwrap();
        let user = UserRepository::new().create(&mut conn, "grace", "hash").await.unwrap();
        repo.create(&mut conn, user.id, "live", 7).await.unwrap();
        repo.create(&mut conn, user.id, "stale", -1).await.unwrap();
        drop(conn);

        let worker = RefreshTokenCleanupWorker::new(pool.clone(), repo.clone(), 60);
        assert_eq!(worker.perform_cleanup().await.unwrap(), 1);
        assert_eq!(worker.perform_cleanup().await.unwrap(), 0);

        let mut conn = pool.acquire().await.unwrap();
        assert!(repo.consume(&mut conn, "live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_zero_interval_exits_immediately() {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        })
        .await
        .unwrap();
        let (_tx, rx) = tokio::sync::watch::channel(false);

        let worker = RefreshTokenCleanupWorker::new(pool, RefreshTokenRepository::new(), 0);
        tokio::time::timeout(Duration::from_secs(1), worker.run(rx)).await.unwrap();
    }
}
