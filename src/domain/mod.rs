pub mod animal;
pub mod auth;
pub mod auth_session;
pub mod user;
