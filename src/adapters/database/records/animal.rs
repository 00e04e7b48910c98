use crate::domain::animal::{Animal, HealthRecord};
use crate::error::AppError;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct AnimalRecord {
    pub(crate) id: Uuid,
    pub(crate) owner_id: Uuid,
    pub(crate) tag: String,
    pub(crate) name: Option<String>,
    pub(crate) species: String,
    pub(crate) breed: Option<String>,
    pub(crate) sex: Option<String>,
    pub(crate) birth_date: Option<Date>,
    pub(crate) status: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl TryFrom<AnimalRecord> for Animal {
    type Error = AppError;

    fn try_from(record: AnimalRecord) -> Result<Self, Self::Error> {
        let status = record.status.parse().map_err(|_| {
            tracing::error!(animal_id = %record.id, status = %record.status, "Corrupt animal status in database");
            AppError::Internal
        })?;

        Ok(Self {
            id: record.id,
            owner_id: record.owner_id,
            tag: record.tag,
            name: record.name,
            species: record.species,
            breed: record.breed,
            sex: record.sex,
            birth_date: record.birth_date,
            status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct HealthRecordRecord {
    pub(crate) id: Uuid,
    pub(crate) animal_id: Uuid,
    pub(crate) kind: String,
    pub(crate) description: String,
    pub(crate) recorded_on: Date,
    pub(crate) created_at: OffsetDateTime,
}

impl From<HealthRecordRecord> for HealthRecord {
    fn from(record: HealthRecordRecord) -> Self {
        Self {
            id: record.id,
            animal_id: record.animal_id,
            kind: record.kind,
            description: record.description,
            recorded_on: record.recorded_on,
            created_at: record.created_at,
        }
    }
}
