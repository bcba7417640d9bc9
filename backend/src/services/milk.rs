//! Milk reception service: tank occupancy, freshness alerts and overflow plans
//!
//! Nothing is cached. Every read refetches the farm's deltas and recomputes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    current_volume, direct_processing_alerts, suggest_strategy, tank_states,
    validate_milk_volume, validate_tank_capacity, validate_transfer_volume, AllocationStrategy,
    DateRange, DirectProcessingAlert, FieldViolation, FreshnessPolicy, MilkReceptionRecord,
    TankCapacities, TankNumber, TankState, UtilizationPolicy,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::MilkReceptionRepository;
use crate::services::change_feed::{ChangeEvent, ChangeFeed, ChangeTable};

/// Milk reception service for one process, serving all farms
#[derive(Clone)]
pub struct MilkReceptionService {
    repo: Arc<dyn MilkReceptionRepository>,
    changes: ChangeFeed,
    default_capacities: TankCapacities,
    utilization: UtilizationPolicy,
    freshness: FreshnessPolicy,
}

/// Input for recording a volume movement
#[derive(Debug, Clone, Deserialize)]
pub struct RecordReceptionInput {
    pub tank_number: TankNumber,
    pub milk_volume: Decimal,
    pub supplier_name: Option<String>,
    pub notes: Option<String>,
}

/// Input for moving milk between tanks
#[derive(Debug, Clone, Deserialize)]
pub struct TransferInput {
    pub from_tank: TankNumber,
    pub to_tank: TankNumber,
    pub volume: Decimal,
    pub notes: Option<String>,
}

/// Suggested placement of a volume across the physical tanks
#[derive(Debug, Clone, Serialize)]
pub struct OverflowPlan {
    pub volume: Decimal,
    pub tank_a_remaining: Decimal,
    pub tank_b_remaining: Decimal,
    pub strategy: AllocationStrategy,
    pub remainder: Decimal,
    pub requires_immediate_action: bool,
}

/// Everything the reception dashboard shows, from one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct MilkDashboard {
    pub tanks: Vec<TankState>,
    pub alerts: Vec<DirectProcessingAlert>,
    /// Present while milk is waiting in direct processing
    pub overflow_plan: Option<OverflowPlan>,
}

impl MilkReceptionService {
    /// Create a new MilkReceptionService instance
    pub fn new(
        repo: Arc<dyn MilkReceptionRepository>,
        changes: ChangeFeed,
        default_capacities: TankCapacities,
        utilization: UtilizationPolicy,
        freshness: FreshnessPolicy,
    ) -> Self {
        Self {
            repo,
            changes,
            default_capacities,
            utilization,
            freshness,
        }
    }

    /// List reception deltas, optionally limited to a date range
    pub async fn list_receptions(
        &self,
        farm_id: Uuid,
        range: Option<DateRange>,
    ) -> AppResult<Vec<MilkReceptionRecord>> {
        let records = self.repo.list(farm_id).await?;
        Ok(match range {
            Some(range) => records
                .into_iter()
                .filter(|r| range.contains(r.created_at.date_naive()))
                .collect(),
            None => records,
        })
    }

    /// Record a volume added to or taken from one tank
    pub async fn record_reception(
        &self,
        farm_id: Uuid,
        input: RecordReceptionInput,
        now: DateTime<Utc>,
    ) -> AppResult<MilkReceptionRecord> {
        validate_milk_volume(input.milk_volume)?;

        let records = self.repo.list(farm_id).await?;
        let volume = current_volume(&records, input.tank_number);

        if input.milk_volume < Decimal::ZERO && volume + input.milk_volume < Decimal::ZERO {
            return Err(AppError::InsufficientVolume(format!(
                "{} holds {} L, cannot remove {} L",
                input.tank_number,
                volume,
                -input.milk_volume
            )));
        }

        let capacities = self.capacities(farm_id).await?;
        if let Some(capacity) = capacities.capacity_of(input.tank_number) {
            if volume + input.milk_volume > capacity {
                tracing::warn!(
                    "{} on farm {} will exceed capacity: {} L of {} L",
                    input.tank_number,
                    farm_id,
                    volume + input.milk_volume,
                    capacity
                );
            }
        }

        let record = MilkReceptionRecord {
            id: Uuid::new_v4(),
            farm_id,
            tank_number: input.tank_number,
            milk_volume: input.milk_volume,
            supplier_name: input.supplier_name,
            notes: input.notes,
            created_at: now,
        };

        self.repo.insert_all(std::slice::from_ref(&record)).await?;
        tracing::info!(
            "Recorded {} L for {} on farm {}",
            record.milk_volume,
            record.tank_number,
            farm_id
        );
        self.notify(farm_id, ChangeTable::MilkReception);
        Ok(record)
    }

    /// Move volume between tanks as a paired withdrawal and deposit
    pub async fn transfer(
        &self,
        farm_id: Uuid,
        input: TransferInput,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<MilkReceptionRecord>> {
        validate_transfer_volume(input.volume)?;
        if input.from_tank == input.to_tank {
            return Err(FieldViolation::new("to_tank", "Source and destination must differ").into());
        }

        let records = self.repo.list(farm_id).await?;
        let available = current_volume(&records, input.from_tank);
        if available < input.volume {
            return Err(AppError::InsufficientVolume(format!(
                "{} holds {} L, cannot transfer {} L",
                input.from_tank, available, input.volume
            )));
        }

        let capacities = self.capacities(farm_id).await?;
        if let Some(capacity) = capacities.capacity_of(input.to_tank) {
            let remaining = (capacity - current_volume(&records, input.to_tank)).max(Decimal::ZERO);
            if input.volume > remaining {
                return Err(AppError::CapacityExceeded(format!(
                    "{} has {} L remaining, cannot accept {} L",
                    input.to_tank, remaining, input.volume
                )));
            }
        }

        let notes = input
            .notes
            .unwrap_or_else(|| format!("Transfer {} -> {}", input.from_tank, input.to_tank));
        let pair = vec![
            MilkReceptionRecord {
                id: Uuid::new_v4(),
                farm_id,
                tank_number: input.from_tank,
                milk_volume: -input.volume,
                supplier_name: None,
                notes: Some(notes.clone()),
                created_at: now,
            },
            MilkReceptionRecord {
                id: Uuid::new_v4(),
                farm_id,
                tank_number: input.to_tank,
                milk_volume: input.volume,
                supplier_name: None,
                notes: Some(notes),
                created_at: now,
            },
        ];

        self.repo.insert_all(&pair).await?;
        tracing::info!(
            "Transferred {} L from {} to {} on farm {}",
            input.volume,
            input.from_tank,
            input.to_tank,
            farm_id
        );
        self.notify(farm_id, ChangeTable::MilkReception);
        Ok(pair)
    }

    /// Configured capacities with the farm's `storage_tanks` overrides applied
    pub async fn capacities(&self, farm_id: Uuid) -> AppResult<TankCapacities> {
        let overrides = self.repo.tank_capacities(farm_id).await?;
        Ok(overrides
            .into_iter()
            .fold(self.default_capacities, |caps, (tank, capacity)| {
                caps.with_override(tank, capacity)
            }))
    }

    /// Override a physical tank's capacity for one farm
    pub async fn set_tank_capacity(
        &self,
        farm_id: Uuid,
        tank: TankNumber,
        capacity: Decimal,
    ) -> AppResult<TankCapacities> {
        if !tank.has_capacity_limit() {
            return Err(FieldViolation::new("tank_number", "Direct processing has no capacity").into());
        }
        validate_tank_capacity(capacity)?;

        self.repo.set_tank_capacity(farm_id, tank, capacity).await?;
        tracing::info!("Set {} capacity to {} L on farm {}", tank, capacity, farm_id);
        self.notify(farm_id, ChangeTable::StorageTanks);
        self.capacities(farm_id).await
    }

    /// Current state of every tank
    pub async fn tank_states(&self, farm_id: Uuid) -> AppResult<Vec<TankState>> {
        let records = self.repo.list(farm_id).await?;
        let capacities = self.capacities(farm_id).await?;
        Ok(tank_states(&records, &capacities, &self.utilization))
    }

    /// Fresh direct-processing volume that still needs a destination
    pub async fn alerts(
        &self,
        farm_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<DirectProcessingAlert>> {
        let records = self.repo.list(farm_id).await?;
        Ok(direct_processing_alerts(&records, &self.freshness, now))
    }

    /// Plan where `volume` should go. Without a volume, plans for whatever is
    /// waiting in direct processing.
    pub async fn overflow_plan(
        &self,
        farm_id: Uuid,
        volume: Option<Decimal>,
    ) -> AppResult<OverflowPlan> {
        if let Some(v) = volume {
            if v <= Decimal::ZERO {
                return Err(FieldViolation::new("volume", "Volume must be positive").into());
            }
        }
        let records = self.repo.list(farm_id).await?;
        let capacities = self.capacities(farm_id).await?;
        let states = tank_states(&records, &capacities, &self.utilization);
        let volume = volume.unwrap_or_else(|| waiting_volume(&records));
        Ok(plan_for(volume, &states))
    }

    /// Tanks, alerts and plan computed from a single fetch
    pub async fn dashboard(&self, farm_id: Uuid, now: DateTime<Utc>) -> AppResult<MilkDashboard> {
        let records = self.repo.list(farm_id).await?;
        let capacities = self.capacities(farm_id).await?;

        let tanks = tank_states(&records, &capacities, &self.utilization);
        let alerts = direct_processing_alerts(&records, &self.freshness, now);
        let waiting = waiting_volume(&records);
        let overflow_plan = (waiting > Decimal::ZERO).then(|| plan_for(waiting, &tanks));

        Ok(MilkDashboard {
            tanks,
            alerts,
            overflow_plan,
        })
    }

    fn notify(&self, farm_id: Uuid, table: ChangeTable) {
        self.changes.publish(ChangeEvent { table, farm_id });
    }
}

fn waiting_volume(records: &[MilkReceptionRecord]) -> Decimal {
    current_volume(records, TankNumber::DirectProcessing).max(Decimal::ZERO)
}

fn remaining_of(states: &[TankState], tank: TankNumber) -> Decimal {
    states
        .iter()
        .find(|s| s.tank_number == tank)
        .and_then(|s| s.remaining_capacity)
        .unwrap_or(Decimal::ZERO)
}

fn plan_for(volume: Decimal, states: &[TankState]) -> OverflowPlan {
    let tank_a_remaining = remaining_of(states, TankNumber::TankA);
    let tank_b_remaining = remaining_of(states, TankNumber::TankB);
    let strategy = suggest_strategy(volume, tank_a_remaining, tank_b_remaining);
    OverflowPlan {
        volume,
        tank_a_remaining,
        tank_b_remaining,
        remainder: strategy.remainder(),
        requires_immediate_action: strategy.requires_immediate_action(),
        strategy,
    }
}
