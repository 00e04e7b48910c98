use crate::domain::auth_session::{AuthSession as DomainSession, LoginOutcome};
use crate::domain::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self { id: user.id, username: user.username }
    }
}

/// Returned by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: u64,
    pub user: UserProfile,
}

impl From<LoginOutcome> for AuthSession {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            access_token: outcome.session.access_token,
            refresh_token: outcome.session.refresh_token,
            expires_at: outcome.session.expires_at,
            user: outcome.user.into(),
        }
    }
}

/// Returned by refresh. The refresh token is optional on the wire so clients
/// keep their current one when a server does not rotate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl From<DomainSession> for TokenPair {
    fn from(session: DomainSession) -> Self {
        Self {
            access_token: session.access_token,
            refresh_token: Some(session.refresh_token),
            expires_at: Some(session.expires_at),
        }
    }
}
