use crate::client::error::{ClientError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// The three slots of a persisted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    RefreshToken,
    User,
}

impl StoreKey {
    pub const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::User => "user",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Async key-value persistence for the session credentials.
///
/// Reads never fail: a missing or unreadable slot is `None`. Removal is best
/// effort and removing a missing slot is a no-op.
#[async_trait]
pub trait TokenStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: StoreKey) -> Option<String>;

    /// # Errors
    /// Returns `ClientError::Storage` if the value could not be persisted.
    async fn set(&self, key: StoreKey, value: &str) -> Result<()>;

    async fn remove(&self, key: StoreKey);

    async fn remove_all(&self, keys: &[StoreKey]) {
        for key in keys {
            self.remove(*key).await;
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: DashMap<StoreKey, String>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: StoreKey) -> Option<String> {
        self.slots.get(&key).map(|v| v.value().clone())
    }

    async fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.slots.insert(key, value.to_string());
        Ok(())
    }

    async fn remove(&self, key: StoreKey) {
        self.slots.remove(&key);
    }
}

/// One file per slot under `dir`, surviving process restarts.
///
/// Writes go to a temporary file that is renamed over the slot, so a reader
/// sees either the old value or the new one.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    async fn write_atomically(&self, key: StoreKey, value: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let tmp = self.dir.join(format!(".{}.{}.tmp", key.as_str(), uuid::Uuid::new_v4()));
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&tmp).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, self.path(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: StoreKey) -> Option<String> {
        match tokio::fs::read_to_string(self.path(key)).await {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to read token store slot");
                None
            }
        }
    }

    #[tracing::instrument(level = "debug", skip(self, value), err)]
    async fn set(&self, key: StoreKey, value: &str) -> Result<()> {
        self.write_atomically(key, value).await.map_err(|e| ClientError::Storage {
            message: format!("Failed to write {key}: {e}"),
        })
    }

    async fn remove(&self, key: StoreKey) {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, key = %key, "Failed to remove token store slot"),
        }
    }
}
