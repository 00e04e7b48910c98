use crate::domain::animal::{
    Animal as DomainAnimal, AnimalDraft, AnimalStatus, HealthRecord as DomainHealthRecord, HealthRecordDraft,
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: Uuid,
    pub tag: String,
    pub name: Option<String>,
    pub species: String,
    pub breed: Option<String>,
    pub sex: Option<String>,
    #[serde(default, with = "super::iso_date::option")]
    pub birth_date: Option<Date>,
    pub status: AnimalStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<DomainAnimal> for Animal {
    fn from(a: DomainAnimal) -> Self {
        Self {
            id: a.id,
            tag: a.tag,
            name: a.name,
            species: a.species,
            breed: a.breed,
            sex: a.sex,
            birth_date: a.birth_date,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// Body for creating an animal; `PUT` replaces every field with the same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnimal {
    pub tag: String,
    #[serde(default)]
    pub name: Option<String>,
    pub species: String,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default, with = "super::iso_date::option")]
    pub birth_date: Option<Date>,
    #[serde(default)]
    pub status: AnimalStatus,
}

pub type AnimalUpdate = NewAnimal;

impl From<NewAnimal> for AnimalDraft {
    fn from(n: NewAnimal) -> Self {
        Self {
            tag: n.tag,
            name: n.name,
            species: n.species,
            breed: n.breed,
            sex: n.sex,
            birth_date: n.birth_date,
            status: n.status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAnimalsQuery {
    pub status: Option<AnimalStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: Uuid,
    pub animal_id: Uuid,
    pub kind: String,
    pub description: String,
    #[serde(with = "super::iso_date")]
    pub recorded_on: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<DomainHealthRecord> for HealthRecord {
    fn from(r: DomainHealthRecord) -> Self {
        Self {
            id: r.id,
            animal_id: r.animal_id,
            kind: r.kind,
            description: r.description,
            recorded_on: r.recorded_on,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHealthRecord {
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "super::iso_date")]
    pub recorded_on: Date,
}

impl From<NewHealthRecord> for HealthRecordDraft {
    fn from(n: NewHealthRecord) -> Self {
        Self { kind: n.kind, description: n.description, recorded_on: n.recorded_on }
    }
}
