use crate::adapters::database::records::UserRecord;
use crate::domain::user::User;
use crate::error::{AppError, Result};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct UserRepository {}

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Inserts a new user.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the username is taken (case-insensitive).
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, password_hash), err)]
    pub(crate) async fn create(
        &self,
        conn: &mut SqliteConnection,
        username: &str,
        password_hash: &str,
    ) -> Result<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(username)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "Username already exists"))?;

        Ok(record.into())
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_username(&self, conn: &mut SqliteConnection, username: &str) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(conn)
        .await?;

        Ok(record.map(Into::into))
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find_by_id(&self, conn: &mut SqliteConnection, id: Uuid) -> Result<Option<User>> {
        let record =
            sqlx::query_as::<_, UserRecord>("SELECT id, username, password_hash, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(record.map(Into::into))
    }
}
