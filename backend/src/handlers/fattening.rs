//! HTTP handlers for cattle fattening endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use shared::FatteningAnalytics;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::fattening::{
    CompleteFatteningInput, CreateFatteningInput, FatteningView, IntakeOutcome,
    UpdateFatteningInput,
};
use crate::AppState;

/// List all fattening records of a farm
pub async fn list_fattening(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<FatteningView>>> {
    let service = state.fattening_service();
    let records = service.list(farm_id).await?;
    Ok(Json(records.into_iter().map(|r| service.view(r)).collect()))
}

/// Register an animal on intake
pub async fn create_fattening(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CreateFatteningInput>,
) -> AppResult<(StatusCode, Json<FatteningView>)> {
    let service = state.fattening_service();
    match service
        .create(farm_id, input, Utc::now().date_naive())
        .await?
    {
        IntakeOutcome::Created { record } => {
            Ok((StatusCode::CREATED, Json(service.view(record))))
        }
        IntakeOutcome::DuplicateTag { .. } => Err(AppError::DuplicateEntry("tag_number".to_string())),
    }
}

/// Get a fattening record
pub async fn get_fattening(
    State(state): State<AppState>,
    Path((farm_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<FatteningView>> {
    let service = state.fattening_service();
    let record = service.get(farm_id, id).await?;
    Ok(Json(service.view(record)))
}

/// Record a weighing or change the target
pub async fn update_fattening(
    State(state): State<AppState>,
    Path((farm_id, id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateFatteningInput>,
) -> AppResult<Json<FatteningView>> {
    let service = state.fattening_service();
    let record = service
        .update(farm_id, id, input, Utc::now().date_naive())
        .await?;
    Ok(Json(service.view(record)))
}

/// Sell, transfer or otherwise close a fattening record
pub async fn complete_fattening(
    State(state): State<AppState>,
    Path((farm_id, id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CompleteFatteningInput>,
) -> AppResult<Json<FatteningView>> {
    let service = state.fattening_service();
    let record = service
        .complete(farm_id, id, input, Utc::now().date_naive())
        .await?;
    Ok(Json(service.view(record)))
}

/// Delete a fattening record
pub async fn delete_fattening(
    State(state): State<AppState>,
    Path((farm_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let service = state.fattening_service();
    service.delete(farm_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Herd analytics over active records
pub async fn get_fattening_analytics(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FatteningAnalytics>> {
    let service = state.fattening_service();
    let analytics = service.analytics(farm_id).await?;
    Ok(Json(analytics))
}
