use crate::domain::auth::RefreshToken;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub(crate) token_hash: String,
    pub(crate) user_id: Uuid,
    pub(crate) expires_at: OffsetDateTime,
    pub(crate) created_at: OffsetDateTime,
}

impl From<RefreshTokenRecord> for RefreshToken {
    fn from(record: RefreshTokenRecord) -> Self {
        Self {
            token_hash: record.token_hash,
            user_id: record.user_id,
            expires_at: record.expires_at,
            created_at: record.created_at,
        }
    }
}
