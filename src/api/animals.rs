use crate::api::AppState;
use crate::api::middleware::AuthUser;
use crate::api::schemas::Data;
use crate::api::schemas::animals::{
    Animal, AnimalUpdate, HealthRecord, ListAnimalsQuery, NewAnimal, NewHealthRecord,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_animals(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListAnimalsQuery>,
) -> Result<impl IntoResponse> {
    let animals = state.livestock_service.list_animals(auth_user.user_id, query.status).await?;
    Ok(Json(Data::new(animals.into_iter().map(Animal::from).collect::<Vec<_>>())))
}

pub async fn create_animal(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<NewAnimal>,
) -> Result<impl IntoResponse> {
    let animal = state.livestock_service.create_animal(auth_user.user_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(Data::new(Animal::from(animal)))))
}

pub async fn get_animal(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let animal = state.livestock_service.get_animal(auth_user.user_id, animal_id).await?;
    Ok(Json(Data::new(Animal::from(animal))))
}

pub async fn update_animal(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(animal_id): Path<Uuid>,
    Json(payload): Json<AnimalUpdate>,
) -> Result<impl IntoResponse> {
    let animal = state.livestock_service.update_animal(auth_user.user_id, animal_id, payload.into()).await?;
    Ok(Json(Data::new(Animal::from(animal))))
}

pub async fn delete_animal(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.livestock_service.delete_animal(auth_user.user_id, animal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_health_records(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(animal_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let records = state.livestock_service.list_health_records(auth_user.user_id, animal_id).await?;
    Ok(Json(Data::new(records.into_iter().map(HealthRecord::from).collect::<Vec<_>>())))
}

pub async fn add_health_record(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(animal_id): Path<Uuid>,
    Json(payload): Json<NewHealthRecord>,
) -> Result<impl IntoResponse> {
    let record = state.livestock_service.add_health_record(auth_user.user_id, animal_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(Data::new(HealthRecord::from(record)))))
}
