use clap::{Args, Parser, ValueEnum};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub auth: AuthConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub workers: WorkerConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Database connection URL (`sqlite::memory:` for a throwaway database)
    #[arg(long = "database-url", env = "HERDBOOK_DATABASE_URL", default_value = "sqlite:herdbook.db")]
    pub url: String,

    /// Maximum number of pooled connections
    #[arg(long, env = "HERDBOOK_DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before giving up
    #[arg(long, env = "HERDBOOK_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 10)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "HERDBOOK_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "HERDBOOK_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) listener
    #[arg(long, env = "HERDBOOK_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "HERDBOOK_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Per-request timeout applied by the router
    #[arg(long, env = "HERDBOOK_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct AuthConfig {
    /// Secret key for JWT signing
    #[arg(long, env = "HERDBOOK_JWT_SECRET")]
    pub jwt_secret: String,

    /// Access token time-to-live in seconds
    #[arg(long, env = "HERDBOOK_ACCESS_TOKEN_TTL_SECS", default_value_t = 900)]
    pub access_token_ttl_secs: u64,

    /// Refresh token time-to-live in days
    #[arg(long, env = "HERDBOOK_REFRESH_TOKEN_TTL_DAYS", default_value_t = 30)]
    pub refresh_token_ttl_days: i64,
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed for auth endpoints (register/login/refresh)
    #[arg(long, env = "HERDBOOK_AUTH_RATE_LIMIT_PER_SECOND", default_value_t = 5)]
    pub auth_per_second: u32,

    /// Burst allowance for auth endpoints
    #[arg(long, env = "HERDBOOK_AUTH_RATE_LIMIT_BURST", default_value_t = 20)]
    pub auth_burst: u32,
}

#[derive(Clone, Debug, Args)]
pub struct WorkerConfig {
    /// How often to purge expired refresh tokens (0 disables the worker)
    #[arg(long, env = "HERDBOOK_TOKEN_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    pub token_cleanup_interval_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "HERDBOOK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are exported only when set
    #[arg(long, env = "HERDBOOK_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
