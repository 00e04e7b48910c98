use crate::domain::user::User;

/// Token pair issued by login, registration or refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) expires_at: u64,
}

/// A freshly authenticated user together with their tokens.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub(crate) user: User,
    pub(crate) session: AuthSession,
}
