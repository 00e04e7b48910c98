use crate::api::schemas::auth::UserProfile;
use crate::client::error::{ClientError, Result};
use crate::client::token_store::{StoreKey, TokenStore};

/// A signed-in user together with their credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
}

/// Reads the persisted session. All three slots must be present and the cached
/// profile must parse, otherwise there is no session.
pub async fn load(store: &dyn TokenStore) -> Option<Session> {
    let (access_token, refresh_token, user) = tokio::join!(
        store.get(StoreKey::AccessToken),
        store.get(StoreKey::RefreshToken),
        store.get(StoreKey::User),
    );

    let (Some(access_token), Some(refresh_token), Some(user)) = (access_token, refresh_token, user) else {
        return None;
    };

    match serde_json::from_str::<UserProfile>(&user) {
        Ok(user) => Some(Session { user, access_token, refresh_token }),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable cached user profile");
            None
        }
    }
}

/// Writes all three slots. If any write fails every slot is cleared, so a
/// previous session can never be mixed with part of the new one.
///
/// # Errors
/// Returns `ClientError::Storage` if any slot could not be written.
pub async fn save(store: &dyn TokenStore, session: &Session) -> Result<()> {
    let user = serde_json::to_string(&session.user).map_err(|e| ClientError::Storage {
        message: format!("Failed to encode user profile: {e}"),
    })?;

    if let Err(e) = write_slots(store, session, &user).await {
        tracing::warn!(error = %e, "Failed to persist session, clearing stored credentials");
        clear(store).await;
        return Err(e);
    }
    Ok(())
}

async fn write_slots(store: &dyn TokenStore, session: &Session, user: &str) -> Result<()> {
    store.set(StoreKey::AccessToken, &session.access_token).await?;
    store.set(StoreKey::RefreshToken, &session.refresh_token).await?;
    store.set(StoreKey::User, user).await
}

pub async fn clear(store: &dyn TokenStore) {
    store.remove_all(&StoreKey::ALL).await;
}
