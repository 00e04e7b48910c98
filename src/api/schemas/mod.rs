use serde::{Deserialize, Serialize};

pub mod animals;
pub mod auth;
pub mod dashboard;
pub mod health;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Envelope for every successful response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub const fn new(data: T) -> Self {
        Self { data }
    }
}
