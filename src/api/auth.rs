use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::Data;
use crate::api::schemas::auth::{AuthSession, Credentials, LogoutRequest, RefreshRequest, TokenPair, UserProfile};
use crate::error::Result;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn register(State(state): State<AppState>, Json(payload): Json<Credentials>) -> Result<impl IntoResponse> {
    let outcome = state.account_service.register(payload.username, payload.password).await?;
    Ok((StatusCode::CREATED, Json(Data::new(AuthSession::from(outcome)))))
}

pub async fn login(State(state): State<AppState>, Json(payload): Json<Credentials>) -> Result<impl IntoResponse> {
    let outcome = state.auth_service.login(payload.username, payload.password).await?;
    Ok(Json(Data::new(AuthSession::from(outcome))))
}

pub async fn refresh(State(state): State<AppState>, Json(payload): Json<RefreshRequest>) -> Result<impl IntoResponse> {
    let session = state.auth_service.refresh_session(&payload.refresh_token).await?;
    Ok(Json(Data::new(TokenPair::from(session))))
}

/// Revokes the presented refresh token. Does not require an access token, so a
/// client whose access token already expired can still sign out.
pub async fn logout(State(state): State<AppState>, Json(payload): Json<LogoutRequest>) -> Result<impl IntoResponse> {
    state.auth_service.logout(&payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let user = state.account_service.profile(auth_user.user_id).await?;
    Ok(Json(Data::new(UserProfile::from(user))))
}
