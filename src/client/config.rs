use clap::Args;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug, Args)]
pub struct ClientConfig {
    /// Base URL of the herdbook API
    #[arg(long = "server", env = "HERDBOOK_SERVER_URL", default_value = "http://127.0.0.1:3000/api/")]
    pub base_url: Url,

    /// Per-request timeout in milliseconds
    #[arg(long = "timeout-ms", env = "HERDBOOK_CLIENT_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Directory holding the persisted session; kept in memory when unset
    #[arg(long, env = "HERDBOOK_TOKEN_DIR")]
    pub token_dir: Option<PathBuf>,
}

impl ClientConfig {
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url, timeout_ms: DEFAULT_TIMEOUT_MS, token_dir: None }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The base URL with a trailing slash, so relative paths join beneath it.
    #[must_use]
    pub fn api_root(&self) -> Url {
        let mut url = self.base_url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_gains_trailing_slash() {
        let config = ClientConfig::new(Url::parse("http://localhost:3000/api").unwrap());
        assert_eq!(config.api_root().join("animals").unwrap().as_str(), "http://localhost:3000/api/animals");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
