//! Cattle fattening program models and analytics

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An animal tracked from intake to sale or transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FatteningRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    /// Ear tag, unique among active records of a farm
    pub tag_number: String,
    pub breed: String,
    pub entry_date: NaiveDate,
    pub entry_weight: Decimal,
    pub current_weight: Decimal,
    pub target_weight: Decimal,
    /// kg per day since intake, None when no day has elapsed yet
    pub daily_gain: Option<Decimal>,
    pub expected_completion_date: Option<NaiveDate>,
    pub status: FatteningStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_weight: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a fattening record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FatteningStatus {
    #[default]
    Active,
    Sold,
    Transferred,
    Other,
}

impl FatteningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FatteningStatus::Active => "active",
            FatteningStatus::Sold => "sold",
            FatteningStatus::Transferred => "transferred",
            FatteningStatus::Other => "other",
        }
    }

    /// Terminal states are set once by the completion action
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FatteningStatus::Active)
    }
}

impl std::fmt::Display for FatteningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatteningStatus::Active => write!(f, "Active"),
            FatteningStatus::Sold => write!(f, "Sold"),
            FatteningStatus::Transferred => write!(f, "Transferred"),
            FatteningStatus::Other => write!(f, "Other"),
        }
    }
}

impl std::str::FromStr for FatteningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FatteningStatus::Active),
            "sold" => Ok(FatteningStatus::Sold),
            "transferred" => Ok(FatteningStatus::Transferred),
            "other" => Ok(FatteningStatus::Other),
            other => Err(format!("unknown fattening status '{}'", other)),
        }
    }
}

impl FatteningRecord {
    /// Weight put on since intake
    pub fn weight_gained(&self) -> Decimal {
        self.current_weight - self.entry_weight
    }

    /// Progress toward the target weight as a percentage
    pub fn progress_percent(&self) -> Option<Decimal> {
        if self.target_weight <= Decimal::ZERO {
            return None;
        }
        self.current_weight
            .checked_div(self.target_weight)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    /// Recompute the derived gain and projection from the stored intake data
    pub fn refresh_projection(&mut self, as_of: NaiveDate) {
        self.daily_gain = compute_daily_gain(self, as_of);
        self.expected_completion_date = compute_expected_completion(self, self.daily_gain, as_of);
    }
}

/// Whole days elapsed from intake to `as_of`, never negative
pub fn days_since_entry(entry_date: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - entry_date).num_days().max(0)
}

/// Daily gain = (current - entry) / days since entry.
///
/// Returns None on the intake day (or for an intake date in the future).
/// Weight loss is reported as a negative gain.
pub fn compute_daily_gain(record: &FatteningRecord, as_of: NaiveDate) -> Option<Decimal> {
    let days = days_since_entry(record.entry_date, as_of);
    if days == 0 {
        return None;
    }
    Some(record.weight_gained() / Decimal::from(days))
}

/// Projected date the animal reaches its target weight.
///
/// `as_of + ceil((target - current) / daily_gain)` days, or None when there is
/// no positive gain to project with or the date falls outside the calendar.
pub fn compute_expected_completion(
    record: &FatteningRecord,
    daily_gain: Option<Decimal>,
    as_of: NaiveDate,
) -> Option<NaiveDate> {
    let gain = daily_gain.filter(|g| *g > Decimal::ZERO)?;
    let days_to_target = record
        .target_weight
        .checked_sub(record.current_weight)?
        .checked_div(gain)?
        .ceil()
        .to_i64()?;
    as_of.checked_add_signed(Duration::try_days(days_to_target)?)
}

/// Presentation thresholds for gain ratings.
///
/// These are heuristics, so they come from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsThresholds {
    /// Daily gain above this is rated high (kg/day)
    pub high_daily_gain_kg: Decimal,
    /// Average breed gain above this marks the breed as strong (kg)
    pub strong_breed_gain_kg: Decimal,
}

impl Default for AnalyticsThresholds {
    fn default() -> Self {
        Self {
            high_daily_gain_kg: Decimal::new(8, 1),
            strong_breed_gain_kg: Decimal::from(40),
        }
    }
}

/// Rating of a single animal's daily gain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GainRating {
    High,
    Normal,
    Unavailable,
}

impl AnalyticsThresholds {
    pub fn rate_daily_gain(&self, daily_gain: Option<Decimal>) -> GainRating {
        match daily_gain {
            Some(gain) if gain > self.high_daily_gain_kg => GainRating::High,
            Some(_) => GainRating::Normal,
            None => GainRating::Unavailable,
        }
    }

    pub fn is_strong_breed(&self, average_gain: Decimal) -> bool {
        average_gain > self.strong_breed_gain_kg
    }
}

/// Head count and share of one breed among active animals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedShare {
    pub breed: String,
    pub count: u32,
    pub percent: Decimal,
}

/// Average weight gained per breed among active animals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedGain {
    pub breed: String,
    pub average_gain: Decimal,
    pub strong_performer: bool,
}

/// Herd-level analytics over active records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FatteningAnalytics {
    pub total_active: u32,
    pub average_daily_gain: Decimal,
    pub average_progress: Decimal,
    pub breed_distribution: Vec<BreedShare>,
    pub weight_gain_by_breed: Vec<BreedGain>,
}

/// Aggregate analytics over a farm's records.
///
/// Only active records count. Undefined daily gains are left out of the
/// average rather than counted as zero. Breeds are reported in name order.
pub fn aggregate(records: &[FatteningRecord], thresholds: &AnalyticsThresholds) -> FatteningAnalytics {
    let active: Vec<&FatteningRecord> = records
        .iter()
        .filter(|r| r.status == FatteningStatus::Active)
        .collect();

    let gains: Vec<Decimal> = active.iter().filter_map(|r| r.daily_gain).collect();
    let progress: Vec<Decimal> = active.iter().filter_map(|r| r.progress_percent()).collect();

    let mut by_breed: BTreeMap<&str, (u32, Decimal)> = BTreeMap::new();
    for record in &active {
        let entry = by_breed.entry(record.breed.as_str()).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += record.weight_gained();
    }

    let total_active = active.len() as u32;

    let breed_distribution = by_breed
        .iter()
        .map(|(breed, (count, _))| BreedShare {
            breed: breed.to_string(),
            count: *count,
            percent: Decimal::from(*count) / Decimal::from(total_active) * Decimal::ONE_HUNDRED,
        })
        .collect();

    let weight_gain_by_breed = by_breed
        .iter()
        .map(|(breed, (count, total_gain))| {
            let average_gain = *total_gain / Decimal::from(*count);
            BreedGain {
                breed: breed.to_string(),
                average_gain,
                strong_performer: thresholds.is_strong_breed(average_gain),
            }
        })
        .collect();

    FatteningAnalytics {
        total_active,
        average_daily_gain: mean(&gains),
        average_progress: mean(&progress),
        breed_distribution,
        weight_gain_by_breed,
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}
