use crate::adapters::database::records::RefreshTokenRecord;
use crate::domain::auth::RefreshToken;
use crate::error::{AppError, Result};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct RefreshTokenRepository {}

impl RefreshTokenRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Creates a new refresh token record.
    /// Note: We store the HASH, not the raw token.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, token_hash), err)]
    pub(crate) async fn create(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        token_hash: &str,
        ttl_days: i64,
    ) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + time::Duration::days(ttl_days);

        sqlx::query("INSERT INTO refresh_tokens (token_hash, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(token_hash)
            .bind(user_id)
            .bind(expires_at)
            .bind(now)
            .execute(conn)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    /// Deletes the token and returns what was stored, in one statement.
    ///
    /// A given hash can therefore be consumed at most once, even under
    /// concurrent refresh attempts. Expired tokens are consumed too; the caller
    /// decides whether the returned record is still usable.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn, token_hash), err)]
    pub(crate) async fn consume(&self, conn: &mut SqliteConnection, token_hash: &str) -> Result<Option<RefreshToken>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = ?
            RETURNING token_hash, user_id, expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// Revokes a single refresh token (Logout). Returns whether a token was removed.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn, token_hash), err)]
    pub(crate) async fn delete(&self, conn: &mut SqliteConnection, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .execute(conn)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes all expired refresh tokens.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub async fn delete_expired(&self, conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(OffsetDateTime::now_utc())
            .execute(conn)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
