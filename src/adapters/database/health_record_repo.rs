use crate::adapters::database::records::HealthRecordRecord;
use crate::domain::animal::{HealthRecord, HealthRecordDraft};
use crate::error::Result;
use sqlx::SqliteConnection;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct HealthRecordRepository {}

impl HealthRecordRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// # Errors
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, draft), err)]
    pub(crate) async fn create(
        &self,
        conn: &mut SqliteConnection,
        animal_id: Uuid,
        draft: &HealthRecordDraft,
    ) -> Result<HealthRecord> {
        let record = sqlx::query_as::<_, HealthRecordRecord>(
            r#"
            INSERT INTO health_records (id, animal_id, kind, description, recorded_on, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, animal_id, kind, description, recorded_on, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(animal_id)
        .bind(&draft.kind)
        .bind(&draft.description)
        .bind(draft.recorded_on)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(conn)
        .await?;

        Ok(record.into())
    }

    /// Newest first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list_for_animal(&self, conn: &mut SqliteConnection, animal_id: Uuid) -> Result<Vec<HealthRecord>> {
        let records = sqlx::query_as::<_, HealthRecordRecord>(
            r#"
            SELECT id, animal_id, kind, description, recorded_on, created_at
            FROM health_records
            WHERE animal_id = ?
            ORDER BY recorded_on DESC, created_at DESC
            "#,
        )
        .bind(animal_id)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Counts the owner's health records dated on or after `since`.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count_since(&self, conn: &mut SqliteConnection, owner_id: Uuid, since: Date) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM health_records h
            JOIN animals a ON a.id = h.animal_id
            WHERE a.owner_id = ? AND h.recorded_on >= ?
            "#,
        )
        .bind(owner_id)
        .bind(since)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn recent_for_owner(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HealthRecord>> {
        let records = sqlx::query_as::<_, HealthRecordRecord>(
            r#"
            SELECT h.id, h.animal_id, h.kind, h.description, h.recorded_on, h.created_at
            FROM health_records h
            JOIN animals a ON a.id = h.animal_id
            WHERE a.owner_id = ?
            ORDER BY h.recorded_on DESC, h.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }
}
