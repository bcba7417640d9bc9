//! Milk reception, tank occupancy and direct-processing freshness

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Severity;

/// Destination of a milk reception entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TankNumber {
    TankA,
    TankB,
    /// Unlimited holding area for milk awaiting a tank or immediate use
    DirectProcessing,
}

impl TankNumber {
    pub const ALL: [TankNumber; 3] = [
        TankNumber::TankA,
        TankNumber::TankB,
        TankNumber::DirectProcessing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TankNumber::TankA => "tank_a",
            TankNumber::TankB => "tank_b",
            TankNumber::DirectProcessing => "direct_processing",
        }
    }

    pub fn has_capacity_limit(&self) -> bool {
        !matches!(self, TankNumber::DirectProcessing)
    }
}

impl std::fmt::Display for TankNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TankNumber::TankA => write!(f, "Tank A"),
            TankNumber::TankB => write!(f, "Tank B"),
            TankNumber::DirectProcessing => write!(f, "Direct Processing"),
        }
    }
}

impl std::str::FromStr for TankNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tank_a" => Ok(TankNumber::TankA),
            "tank_b" => Ok(TankNumber::TankB),
            "direct_processing" => Ok(TankNumber::DirectProcessing),
            other => Err(format!("unknown tank '{}'", other)),
        }
    }
}

/// A signed volume movement for one tank.
///
/// Positive volume is an addition, negative is consumption or a transfer out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MilkReceptionRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub tank_number: TankNumber,
    /// Litres
    pub milk_volume: Decimal,
    pub supplier_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Capacity of the two physical tanks in litres
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TankCapacities {
    pub tank_a: Decimal,
    pub tank_b: Decimal,
}

impl TankCapacities {
    /// None for the unlimited direct-processing area
    pub fn capacity_of(&self, tank: TankNumber) -> Option<Decimal> {
        match tank {
            TankNumber::TankA => Some(self.tank_a),
            TankNumber::TankB => Some(self.tank_b),
            TankNumber::DirectProcessing => None,
        }
    }

    pub fn with_override(mut self, tank: TankNumber, capacity: Decimal) -> Self {
        match tank {
            TankNumber::TankA => self.tank_a = capacity,
            TankNumber::TankB => self.tank_b = capacity,
            TankNumber::DirectProcessing => {}
        }
        self
    }
}

impl Default for TankCapacities {
    fn default() -> Self {
        Self {
            tank_a: Decimal::from(5000),
            tank_b: Decimal::from(5000),
        }
    }
}

/// Utilization percentages at which a tank escalates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UtilizationPolicy {
    pub warning_percent: Decimal,
    pub critical_percent: Decimal,
}

impl Default for UtilizationPolicy {
    fn default() -> Self {
        Self {
            warning_percent: Decimal::from(70),
            critical_percent: Decimal::from(90),
        }
    }
}

impl UtilizationPolicy {
    pub fn classify(&self, utilization_percent: Decimal) -> Severity {
        if utilization_percent >= self.critical_percent {
            Severity::Critical
        } else if utilization_percent >= self.warning_percent {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }
}

/// Occupancy of one tank derived from its reception records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TankState {
    pub tank_number: TankNumber,
    pub capacity: Option<Decimal>,
    pub current_volume: Decimal,
    pub remaining_capacity: Option<Decimal>,
    /// Clamped to 0..=100, None for the unlimited area
    pub utilization_percent: Option<Decimal>,
    pub level: Option<Severity>,
}

/// Net volume of one tank: the sum of all its deltas
pub fn current_volume(records: &[MilkReceptionRecord], tank: TankNumber) -> Decimal {
    records
        .iter()
        .filter(|r| r.tank_number == tank)
        .map(|r| r.milk_volume)
        .sum()
}

/// Utilization of a finite tank, clamped to 0..=100
pub fn utilization_percent(current_volume: Decimal, capacity: Decimal) -> Decimal {
    if capacity <= Decimal::ZERO {
        return Decimal::ONE_HUNDRED;
    }
    (current_volume / capacity * Decimal::ONE_HUNDRED)
        .max(Decimal::ZERO)
        .min(Decimal::ONE_HUNDRED)
}

/// Recompute every tank's state from the full record set
pub fn tank_states(
    records: &[MilkReceptionRecord],
    capacities: &TankCapacities,
    policy: &UtilizationPolicy,
) -> Vec<TankState> {
    TankNumber::ALL
        .iter()
        .map(|&tank| {
            let volume = current_volume(records, tank);
            let capacity = capacities.capacity_of(tank);
            let utilization = capacity.map(|c| utilization_percent(volume, c));
            TankState {
                tank_number: tank,
                capacity,
                current_volume: volume,
                remaining_capacity: capacity.map(|c| (c - volume).max(Decimal::ZERO)),
                utilization_percent: utilization,
                level: utilization.map(|u| policy.classify(u)),
            }
        })
        .collect()
}

/// Freshness window for milk held in direct processing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub window_minutes: i64,
    /// Below this many minutes left an alert is urgent
    pub urgent_minutes: i64,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window_minutes: 180,
            urgent_minutes: 60,
        }
    }
}

impl FreshnessPolicy {
    pub fn deadline(&self, submitted_at: DateTime<Utc>) -> DateTime<Utc> {
        submitted_at + Duration::minutes(self.window_minutes)
    }
}

/// Per-entry lifecycle of direct-processing volume
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessState {
    Fresh,
    Expired,
    /// All of the entry's volume has been consumed or transferred
    Resolved,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertUrgency {
    Urgent,
    Standard,
}

/// A positive direct-processing entry with the share of net volume still
/// attributed to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingVolume {
    pub record_id: Uuid,
    pub supplier_name: Option<String>,
    pub original_volume: Decimal,
    pub remaining_volume: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

impl PendingVolume {
    pub fn state(&self, now: DateTime<Utc>) -> FreshnessState {
        if self.remaining_volume <= Decimal::ZERO {
            FreshnessState::Resolved
        } else if now >= self.deadline {
            FreshnessState::Expired
        } else {
            FreshnessState::Fresh
        }
    }
}

/// Active alert for milk that must leave direct processing before its deadline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectProcessingAlert {
    pub record_id: Uuid,
    pub supplier_name: Option<String>,
    pub remaining_volume: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub minutes_remaining: i64,
    pub urgency: AlertUrgency,
}

/// Attribute the net direct-processing volume to positive entries.
///
/// Consumption removes the oldest volume first, so the net total is assigned
/// from the newest entry backwards. The result is in submission order and
/// includes fully consumed entries with zero remaining volume.
pub fn pending_volumes(
    records: &[MilkReceptionRecord],
    policy: &FreshnessPolicy,
) -> Vec<PendingVolume> {
    let mut unassigned = current_volume(records, TankNumber::DirectProcessing).max(Decimal::ZERO);

    let mut additions: Vec<&MilkReceptionRecord> = records
        .iter()
        .filter(|r| r.tank_number == TankNumber::DirectProcessing && r.milk_volume > Decimal::ZERO)
        .collect();
    additions.sort_by_key(|r| std::cmp::Reverse(r.created_at));

    let mut pending: Vec<PendingVolume> = additions
        .into_iter()
        .map(|r| {
            let remaining = r.milk_volume.min(unassigned);
            unassigned -= remaining;
            PendingVolume {
                record_id: r.id,
                supplier_name: r.supplier_name.clone(),
                original_volume: r.milk_volume,
                remaining_volume: remaining,
                submitted_at: r.created_at,
                deadline: policy.deadline(r.created_at),
            }
        })
        .collect();

    pending.reverse();
    pending
}

/// Alerts for direct-processing volume that is still present and fresh
pub fn direct_processing_alerts(
    records: &[MilkReceptionRecord],
    policy: &FreshnessPolicy,
    now: DateTime<Utc>,
) -> Vec<DirectProcessingAlert> {
    pending_volumes(records, policy)
        .into_iter()
        .filter(|p| p.state(now) == FreshnessState::Fresh)
        .map(|p| {
            let minutes_remaining = (p.deadline - now).num_minutes();
            let urgency = if minutes_remaining < policy.urgent_minutes {
                AlertUrgency::Urgent
            } else {
                AlertUrgency::Standard
            };
            DirectProcessingAlert {
                record_id: p.record_id,
                supplier_name: p.supplier_name,
                remaining_volume: p.remaining_volume,
                submitted_at: p.submitted_at,
                deadline: p.deadline,
                minutes_remaining,
                urgency,
            }
        })
        .collect()
}
