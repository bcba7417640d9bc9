//! HTTP handlers for milk reception endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{DateRange, DirectProcessingAlert, MilkReceptionRecord, TankCapacities, TankNumber, TankState};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::milk::{MilkDashboard, OverflowPlan, RecordReceptionInput, TransferInput};
use crate::AppState;

/// Optional date filter for reception listings
#[derive(Debug, Deserialize)]
pub struct ReceptionQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReceptionQuery {
    fn range(&self) -> Option<DateRange> {
        match (self.from, self.to) {
            (None, None) => None,
            (start, end) => Some(DateRange {
                start: start.unwrap_or(NaiveDate::MIN),
                end: end.unwrap_or(NaiveDate::MAX),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OverflowQuery {
    pub volume: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct TankCapacityInput {
    pub capacity_liters: Decimal,
}

/// List reception deltas
pub async fn list_receptions(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReceptionQuery>,
) -> AppResult<Json<Vec<MilkReceptionRecord>>> {
    let service = state.milk_service();
    let records = service.list_receptions(farm_id, query.range()).await?;
    Ok(Json(records))
}

/// Record milk added to or taken from a tank
pub async fn record_reception(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<RecordReceptionInput>,
) -> AppResult<(StatusCode, Json<MilkReceptionRecord>)> {
    let service = state.milk_service();
    let record = service.record_reception(farm_id, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Move milk from one tank to another
pub async fn transfer_milk(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<TransferInput>,
) -> AppResult<(StatusCode, Json<Vec<MilkReceptionRecord>>)> {
    let service = state.milk_service();
    let records = service.transfer(farm_id, input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(records)))
}

/// Current state of every tank
pub async fn get_tank_states(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<TankState>>> {
    let service = state.milk_service();
    let tanks = service.tank_states(farm_id).await?;
    Ok(Json(tanks))
}

/// Override a tank's capacity for the farm
pub async fn update_tank_capacity(
    State(state): State<AppState>,
    Path((farm_id, tank)): Path<(Uuid, TankNumber)>,
    Json(input): Json<TankCapacityInput>,
) -> AppResult<Json<TankCapacities>> {
    let service = state.milk_service();
    let capacities = service
        .set_tank_capacity(farm_id, tank, input.capacity_liters)
        .await?;
    Ok(Json(capacities))
}

/// Direct-processing freshness alerts
pub async fn get_milk_alerts(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<DirectProcessingAlert>>> {
    let service = state.milk_service();
    let alerts = service.alerts(farm_id, Utc::now()).await?;
    Ok(Json(alerts))
}

/// Allocation strategy for a volume, or for the milk waiting in direct processing
pub async fn get_overflow_plan(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<OverflowQuery>,
) -> AppResult<Json<OverflowPlan>> {
    let service = state.milk_service();
    let plan = service.overflow_plan(farm_id, query.volume).await?;
    Ok(Json(plan))
}

/// Tanks, alerts and plan in one response
pub async fn get_milk_dashboard(
    State(state): State<AppState>,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<MilkDashboard>> {
    let service = state.milk_service();
    let dashboard = service.dashboard(farm_id, Utc::now()).await?;
    Ok(Json(dashboard))
}
