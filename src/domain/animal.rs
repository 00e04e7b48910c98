use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalStatus {
    #[default]
    Active,
    Sold,
    Deceased,
}

impl AnimalStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Deceased => "deceased",
        }
    }
}

impl fmt::Display for AnimalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AnimalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(Self::Active),
            "sold" => Ok(Self::Sold),
            "deceased" => Ok(Self::Deceased),
            other => Err(AppError::BadRequest(format!("Unknown animal status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animal {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub tag: String,
    pub name: Option<String>,
    pub species: String,
    pub breed: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<Date>,
    pub status: AnimalStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Caller-supplied fields for creating or replacing an animal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalDraft {
    pub tag: String,
    pub name: Option<String>,
    pub species: String,
    pub breed: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<Date>,
    pub status: AnimalStatus,
}

impl AnimalDraft {
    /// Trims text fields and rejects drafts without an ear tag or species.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` naming the missing field.
    pub fn normalized(self) -> Result<Self> {
        let tag = self.tag.trim().to_string();
        if tag.is_empty() {
            return Err(AppError::BadRequest("tag must not be empty".into()));
        }
        let species = self.species.trim().to_lowercase();
        if species.is_empty() {
            return Err(AppError::BadRequest("species must not be empty".into()));
        }

        Ok(Self {
            tag,
            species,
            name: non_blank(self.name),
            breed: non_blank(self.breed),
            sex: non_blank(self.sex),
            ..self
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    pub id: Uuid,
    pub animal_id: Uuid,
    pub kind: String,
    pub description: String,
    pub recorded_on: Date,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecordDraft {
    pub kind: String,
    pub description: String,
    pub recorded_on: Date,
}

impl HealthRecordDraft {
    /// # Errors
    /// Returns `AppError::BadRequest` if the record kind is blank.
    pub fn normalized(self) -> Result<Self> {
        let kind = self.kind.trim().to_lowercase();
        if kind.is_empty() {
            return Err(AppError::BadRequest("kind must not be empty".into()));
        }
        Ok(Self { kind, description: self.description.trim().to_string(), ..self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total_animals: i64,
    pub by_status: Vec<(AnimalStatus, i64)>,
    pub by_species: Vec<(String, i64)>,
    pub health_records_last_30_days: i64,
    pub recent_health_records: Vec<HealthRecord>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn draft() -> AnimalDraft {
        AnimalDraft {
            tag: "  UK-0042 ".into(),
            name: Some("   ".into()),
            species: " Cattle".into(),
            breed: Some("Angus".into()),
            sex: None,
            birth_date: Some(date!(2023 - 04 - 11)),
            status: AnimalStatus::Active,
        }
    }

    #[test]
    fn test_draft_normalization() {
        let d = draft().normalized().unwrap();
        assert_eq!(d.tag, "UK-0042");
        assert_eq!(d.species, "cattle");
        assert_eq!(d.name, None);
        assert_eq!(d.breed.as_deref(), Some("Angus"));
    }

    #[test]
    fn test_blank_tag_rejected() {
        let d = AnimalDraft { tag: "  ".into(), ..draft() };
        assert!(matches!(d.normalized(), Err(AppError::BadRequest(m)) if m.contains("tag")));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("sold".parse::<AnimalStatus>().unwrap(), AnimalStatus::Sold);
        assert!("missing".parse::<AnimalStatus>().is_err());
        assert_eq!(AnimalStatus::Deceased.to_string(), "deceased");
    }

    #[test]
    fn test_health_record_kind_required() {
        let d = HealthRecordDraft { kind: " ".into(), description: "x".into(), recorded_on: date!(2024 - 01 - 01) };
        assert!(d.normalized().is_err());
    }
}
