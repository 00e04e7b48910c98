use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::Data;
use crate::api::schemas::dashboard::DashboardSummary;
use crate::error::Result;
use axum::{Json, extract::State, response::IntoResponse};

pub async fn summary(auth_user: AuthUser, State(state): State<AppState>) -> Result<impl IntoResponse> {
    let summary = state.livestock_service.dashboard(auth_user.user_id).await?;
    Ok(Json(Data::new(DashboardSummary::from(summary))))
}
