use crate::adapters::database::DbPool;
use crate::adapters::database::animal_repo::AnimalRepository;
use crate::adapters::database::health_record_repo::HealthRecordRepository;
use crate::domain::animal::{
    Animal, AnimalDraft, AnimalStatus, DashboardSummary, HealthRecord, HealthRecordDraft,
};
use crate::error::{AppError, Result};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

const DASHBOARD_WINDOW_DAYS: i64 = 30;
const DASHBOARD_RECENT_RECORDS: i64 = 5;

/// Animal and health-record operations, always scoped to the requesting owner.
#[derive(Clone, Debug)]
pub struct LivestockService {
    pool: DbPool,
    animals: AnimalRepository,
    health_records: HealthRecordRepository,
}

impl LivestockService {
    #[must_use]
    pub const fn new(pool: DbPool, animals: AnimalRepository, health_records: HealthRecordRepository) -> Self {
        Self { pool, animals, health_records }
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(skip(self), err)]
    pub async fn list_animals(&self, owner_id: Uuid, status: Option<AnimalStatus>) -> Result<Vec<Animal>> {
        let mut conn = self.pool.acquire().await?;
        self.animals.list(&mut conn, owner_id, status).await
    }

    /// # Errors
    /// Returns `AppError::BadRequest` for an invalid draft or `AppError::Conflict` for a duplicate tag.
    #[tracing::instrument(skip(self, draft), fields(animal_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn create_animal(&self, owner_id: Uuid, draft: AnimalDraft) -> Result<Animal> {
        let draft = draft.normalized()?;
        let mut conn = self.pool.acquire().await?;
        let animal = self.animals.create(&mut conn, owner_id, &draft).await?;
        tracing::Span::current().record("animal_id", tracing::field::display(animal.id));
        Ok(animal)
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the owner has no such animal.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn get_animal(&self, owner_id: Uuid, animal_id: Uuid) -> Result<Animal> {
        let mut conn = self.pool.acquire().await?;
        self.animals.find(&mut conn, owner_id, animal_id).await?.ok_or(AppError::NotFound)
    }

    /// # Errors
    /// Returns `AppError::NotFound`, `AppError::BadRequest` or `AppError::Conflict`.
    #[tracing::instrument(skip(self, draft), err(level = "warn"))]
    pub async fn update_animal(&self, owner_id: Uuid, animal_id: Uuid, draft: AnimalDraft) -> Result<Animal> {
        let draft = draft.normalized()?;
        let mut conn = self.pool.acquire().await?;
        self.animals.update(&mut conn, owner_id, animal_id, &draft).await?.ok_or(AppError::NotFound)
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the owner has no such animal.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete_animal(&self, owner_id: Uuid, animal_id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        if self.animals.delete(&mut conn, owner_id, animal_id).await? { Ok(()) } else { Err(AppError::NotFound) }
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the owner has no such animal.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_health_records(&self, owner_id: Uuid, animal_id: Uuid) -> Result<Vec<HealthRecord>> {
        let mut conn = self.pool.acquire().await?;
        self.animals.find(&mut conn, owner_id, animal_id).await?.ok_or(AppError::NotFound)?;
        self.health_records.list_for_animal(&mut conn, animal_id).await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the owner has no such animal, or `AppError::BadRequest`.
    #[tracing::instrument(skip(self, draft), err(level = "warn"))]
    pub async fn add_health_record(
        &self,
        owner_id: Uuid,
        animal_id: Uuid,
        draft: HealthRecordDraft,
    ) -> Result<HealthRecord> {
        let draft = draft.normalized()?;
        let mut conn = self.pool.acquire().await?;
        self.animals.find(&mut conn, owner_id, animal_id).await?.ok_or(AppError::NotFound)?;
        self.health_records.create(&mut conn, animal_id, &draft).await
    }

    /// Aggregates herd counts and recent health activity for the dashboard.
    ///
    /// # Errors
    /// Returns `AppError::Database` if any query fails.
    #[tracing::instrument(skip(self), err)]
    pub async fn dashboard(&self, owner_id: Uuid) -> Result<DashboardSummary> {
        let mut conn = self.pool.acquire().await?;

        let by_status = self.animals.count_by_status(&mut conn, owner_id).await?;
        let by_species = self.animals.count_by_species(&mut conn, owner_id).await?;
        let since = (OffsetDateTime::now_utc() - Duration::days(DASHBOARD_WINDOW_DAYS)).date();
        let health_records_last_30_days = self.health_records.count_since(&mut conn, owner_id, since).await?;
        let recent_health_records =
            self.health_records.recent_for_owner(&mut conn, owner_id, DASHBOARD_RECENT_RECORDS).await?;

        Ok(DashboardSummary {
            total_animals: by_status.iter().map(|(_, n)| n).sum(),
            by_status,
            by_species,
            health_records_last_30_days,
            recent_health_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::init_pool;
    use crate::adapters::database::user_repo::UserRepository;
    use crate::config::DatabaseConfig;
    use time::macros::date;

    async fn setup() -> (LivestockService, Uuid, Uuid) {
        let pool = init_pool(&DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            acquire_timeout_secs: 5,
        })
        .await
        .unwrap();
        crate::run_migrations(&pool).await.unwrap();

        let users = UserRepository::new();
        let mut conn = pool.acquire().await.unwrap();
        let owner = users.create(&mut conn, "owner", "hash").await.unwrap().id;
        let other = users.create(&mut conn, "other", "hash").await.unwrap().id;
        drop(conn);

        (LivestockService::new(pool, AnimalRepository::new(), HealthRecordRepository::new()), owner, other)
    }

    fn cow(tag: &str) -> AnimalDraft {
        AnimalDraft {
            tag: tag.into(),
            name: None,
            species: "cattle".into(),
            breed: None,
            sex: Some("female".into()),
            birth_date: Some(date!(2022 - 03 - 01)),
            status: AnimalStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_duplicate_tag_conflicts_per_owner() {
        let (service, owner, other) = setup().await;
        service.create_animal(owner, cow("A1")).await.unwrap();

        let dup = service.create_animal(owner, cow("A1")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        // Another owner may reuse the tag.
        service.create_animal(other, cow("A1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_animals_are_owner_scoped() {
        let (service, owner, other) = setup().await;
        let animal = service.create_animal(owner, cow("B7")).await.unwrap();

        assert!(matches!(service.get_animal(other, animal.id).await, Err(AppError::NotFound)));
        assert!(matches!(service.delete_animal(other, animal.id).await, Err(AppError::NotFound)));
        assert!(service.list_animals(other, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_status_filter() {
        let (service, owner, _) = setup().await;
        let a = service.create_animal(owner, cow("C1")).await.unwrap();
        service.create_animal(owner, cow("C2")).await.unwrap();

        let sold = service
            .update_animal(owner, a.id, AnimalDraft { status: AnimalStatus::Sold, ..cow("C1") })
            .await
            .unwrap();
        assert_eq!(sold.status, AnimalStatus::Sold);

        let active = service.list_animals(owner, Some(AnimalStatus::Active)).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].tag, "C2");
    }

    #[tokio::test]
    async fn test_dashboard_aggregates() {
        let (service, owner, _) = setup().await;
        let a = service.create_animal(owner, cow("D1")).await.unwrap();
        service
            .create_animal(owner, AnimalDraft { species: "sheep".into(), status: AnimalStatus::Deceased, ..cow("D2") })
            .await
            .unwrap();
        service.create_animal(owner, cow("D3")).await.unwrap();

        let today = OffsetDateTime::now_utc().date();
        service
            .add_health_record(
                owner,
                a.id,
                HealthRecordDraft { kind: "Vaccination".into(), description: "BVD".into(), recorded_on: today },
            )
            .await
            .unwrap();
        service
            .add_health_record(
                owner,
                a.id,
                HealthRecordDraft { kind: "checkup".into(), description: "old".into(), recorded_on: date!(2001 - 01 - 01) },
            )
            .await
            .unwrap();

        let summary = service.dashboard(owner).await.unwrap();
        assert_eq!(summary.total_animals, 3);
        assert_eq!(summary.by_species[0], ("cattle".to_string(), 2));
        assert!(summary.by_status.contains(&(AnimalStatus::Deceased, 1)));
        assert_eq!(summary.health_records_last_30_days, 1);
        assert_eq!(summary.recent_health_records.len(), 2);
        assert_eq!(summary.recent_health_records[0].kind, "vaccination");
    }

    #[tokio::test]
    async fn test_deleting_animal_removes_health_records() {
        let (service, owner, _) = setup().await;
        let a = service.create_animal(owner, cow("E1")).await.unwrap();
        service
            .add_health_record(
                owner,
                a.id,
                HealthRecordDraft { kind: "treatment".into(), description: "".into(), recorded_on: date!(2024 - 05 - 05) },
            )
            .await
            .unwrap();

        service.delete_animal(owner, a.id).await.unwrap();
        assert_eq!(service.dashboard(owner).await.unwrap().recent_health_records.len(), 0);
    }
}
