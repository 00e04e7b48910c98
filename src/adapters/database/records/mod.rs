pub mod animal;
pub mod refresh_token;
pub mod user;

pub use animal::{AnimalRecord, HealthRecordRecord};
pub use refresh_token::RefreshTokenRecord;
pub use user::UserRecord;
