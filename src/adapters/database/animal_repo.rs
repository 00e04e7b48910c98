use crate::adapters::database::records::AnimalRecord;
use crate::domain::animal::{Animal, AnimalDraft, AnimalStatus};
use crate::error::{AppError, Result};
use sqlx::SqliteConnection;
use time::OffsetDateTime;
use uuid::Uuid;

const ANIMAL_COLUMNS: &str =
    "id, owner_id, tag, name, species, breed, sex, birth_date, status, created_at, updated_at";

const DUPLICATE_TAG: &str = "An animal with this tag already exists";

#[derive(Clone, Debug, Default)]
pub struct AnimalRepository {}

impl AnimalRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// # Errors
    /// Returns `AppError::Conflict` if the owner already has an animal with this tag.
    /// Returns `AppError::Database` if the insert fails.
    #[tracing::instrument(level = "debug", skip(self, conn, draft), err)]
    pub(crate) async fn create(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
        draft: &AnimalDraft,
    ) -> Result<Animal> {
        let now = OffsetDateTime::now_utc();
        let record = sqlx::query_as::<_, AnimalRecord>(&format!(
            r#"
            INSERT INTO animals (id, owner_id, tag, name, species, breed, sex, birth_date, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {ANIMAL_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(&draft.tag)
        .bind(&draft.name)
        .bind(&draft.species)
        .bind(&draft.breed)
        .bind(&draft.sex)
        .bind(draft.birth_date)
        .bind(draft.status.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_TAG))?;

        record.try_into()
    }

    /// Lists the owner's animals ordered by tag, optionally filtered by status.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn list(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
        status: Option<AnimalStatus>,
    ) -> Result<Vec<Animal>> {
        let records = sqlx::query_as::<_, AnimalRecord>(&format!(
            r#"
            SELECT {ANIMAL_COLUMNS} FROM animals
            WHERE owner_id = ? AND (? IS NULL OR status = ?)
            ORDER BY tag
            "#
        ))
        .bind(owner_id)
        .bind(status.map(AnimalStatus::as_str))
        .bind(status.map(AnimalStatus::as_str))
        .fetch_all(conn)
        .await?;

        records.into_iter().map(TryInto::try_into).collect()
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn find(&self, conn: &mut SqliteConnection, owner_id: Uuid, id: Uuid) -> Result<Option<Animal>> {
        let record = sqlx::query_as::<_, AnimalRecord>(&format!(
            "SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ? AND owner_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(conn)
        .await?;

        record.map(TryInto::try_into).transpose()
    }

    /// Replaces the mutable fields of an animal. Returns `None` if the owner has no such animal.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the new tag collides with another animal.
    /// Returns `AppError::Database` if the update fails.
    #[tracing::instrument(level = "debug", skip(self, conn, draft), err)]
    pub(crate) async fn update(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
        id: Uuid,
        draft: &AnimalDraft,
    ) -> Result<Option<Animal>> {
        let record = sqlx::query_as::<_, AnimalRecord>(&format!(
            r#"
            UPDATE animals
            SET tag = ?, name = ?, species = ?, breed = ?, sex = ?, birth_date = ?, status = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            RETURNING {ANIMAL_COLUMNS}
            "#
        ))
        .bind(&draft.tag)
        .bind(&draft.name)
        .bind(&draft.species)
        .bind(&draft.breed)
        .bind(&draft.sex)
        .bind(draft.birth_date)
        .bind(draft.status.as_str())
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .bind(owner_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, DUPLICATE_TAG))?;

        record.map(TryInto::try_into).transpose()
    }

    /// Deletes an animal and, through the foreign key, its health records.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn delete(&self, conn: &mut SqliteConnection, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM animals WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count_by_status(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
    ) -> Result<Vec<(AnimalStatus, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM animals WHERE owner_id = ? GROUP BY status ORDER BY status",
        )
        .bind(owner_id)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(|(status, count)| Ok::<_, AppError>((status.parse::<AnimalStatus>()?, count))).collect()
    }

    /// Per-species counts, largest herd first.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn), err)]
    pub(crate) async fn count_by_species(
        &self,
        conn: &mut SqliteConnection,
        owner_id: Uuid,
    ) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT species, COUNT(*) AS n FROM animals WHERE owner_id = ? GROUP BY species ORDER BY n DESC, species",
        )
        .bind(owner_id)
        .fetch_all(conn)
        .await?;

        Ok(rows)
    }
}
