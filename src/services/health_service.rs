use crate::adapters::database::DbPool;
use opentelemetry::{KeyValue, global, metrics::Gauge};
use std::time::Duration;
use tokio::time::timeout;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct Metrics {
    pub status: Gauge<i64>,
}

impl Metrics {
    #[must_use]
    pub(crate) fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            status: meter
                .i64_gauge("herdbook_health_status")
                .with_description("Status of health checks (1 for ok, 0 for error)")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthService {
    pool: DbPool,
    metrics: Metrics,
}

impl HealthService {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool, metrics: Metrics::new() }
    }

    /// Checks that the database answers and carries the migrated schema.
    /// Returns the latest applied migration version.
    ///
    /// # Errors
    /// Returns a string describing the failure if the database is unreachable,
    /// slow, or has no migrations applied.
    pub async fn check_db(&self) -> Result<i64, String> {
        let query = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1",
        )
        .fetch_one(&self.pool);

        let outcome = match timeout(DB_CHECK_TIMEOUT, query).await {
            Ok(Ok(Some(version))) => Ok(version),
            Ok(Ok(None)) => Err("Database schema has not been migrated".to_string()),
            Ok(Err(e)) => Err(format!("Database check failed: {e}")),
            Err(_) => Err("Database check timed out".to_string()),
        };

        let status = i64::from(outcome.is_ok());
        self.metrics.status.record(status, &[KeyValue::new("component", "database")]);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::init_pool;
    use crate::config::DatabaseConfig;

    async fn pool() -> DbPool {
        init_pool(&DatabaseConfig { url: "sqlite::memory:".into(), max_connections: 1, acquire_timeout_secs: 5 })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reports_latest_migration() {
        let pool = pool().await;
        crate::run_migrations(&pool).await.unwrap();

        let version = HealthService::new(pool).check_db().await.unwrap();
        assert_eq!(version, 20_260_301_000_100);
    }

    #[tokio::test]
    async fn test_unmigrated_database_is_not_ready() {
        let err = HealthService::new(pool().await).check_db().await.unwrap_err();
        // No migrations table at all on a fresh database.
        assert!(err.starts_with("Database check failed"), "{err}");
    }

    #[tokio::test]
    async fn test_closed_pool_is_not_ready() {
        let pool = pool().await;
        crate::run_migrations(&pool).await.unwrap();
        pool.close().await;

        assert!(HealthService::new(pool).check_db().await.is_err());
    }
}
