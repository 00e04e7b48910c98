use crate::api::schemas::animals::HealthRecord;
use crate::domain::animal::{AnimalStatus, DashboardSummary as DomainSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: AnimalStatus,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_animals: i64,
    pub by_status: Vec<StatusCount>,
    pub by_species: Vec<SpeciesCount>,
    pub health_records_last_30_days: i64,
    pub recent_health_records: Vec<HealthRecord>,
}

impl From<DomainSummary> for DashboardSummary {
    fn from(s: DomainSummary) -> Self {
        Self {
            total_animals: s.total_animals,
            by_status: s.by_status.into_iter().map(|(status, count)| StatusCount { status, count }).collect(),
            by_species: s.by_species.into_iter().map(|(species, count)| SpeciesCount { species, count }).collect(),
            health_records_last_30_days: s.health_records_last_30_days,
            recent_health_records: s.recent_health_records.into_iter().map(Into::into).collect(),
        }
    }
}
