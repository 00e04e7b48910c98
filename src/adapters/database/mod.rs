pub mod animal_repo;
pub mod health_record_repo;
pub mod records;
pub mod refresh_token_repo;
pub mod user_repo;

use crate::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

/// Initializes the database connection pool.
///
/// An in-memory database exists per connection, so it is pinned to a single
/// connection that never idles out.
///
/// # Errors
/// Returns `sqlx::Error` if the URL is invalid or the connection fails.
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
    let pool_options = if in_memory {
        pool_options.max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
    } else {
        pool_options.max_connections(config.max_connections)
    };

    pool_options.connect_with(options).await
}
