//! Cattle fattening service: intake, weight updates, completion and analytics

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    aggregate, validate_fattening_intake, validate_sale_price, validate_weight,
    AnalyticsThresholds, FatteningAnalytics, FatteningRecord, FatteningStatus, FieldViolation,
    GainRating,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::FatteningRepository;
use crate::services::change_feed::{ChangeEvent, ChangeFeed, ChangeTable};

/// Breed recorded when intake does not name one
pub const UNKNOWN_BREED: &str = "Unknown";

/// Fattening service for managing the herd of a farm
#[derive(Clone)]
pub struct FatteningService {
    repo: Arc<dyn FatteningRepository>,
    changes: ChangeFeed,
    thresholds: AnalyticsThresholds,
}

/// Input for registering an animal on intake
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFatteningInput {
    #[serde(default)]
    pub tag_number: String,
    pub breed: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub entry_weight: Option<Decimal>,
    /// Defaults to the entry weight
    pub current_weight: Option<Decimal>,
    pub target_weight: Option<Decimal>,
    pub notes: Option<String>,
}

/// Input for a periodic weighing or a target change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFatteningInput {
    pub current_weight: Option<Decimal>,
    pub target_weight: Option<Decimal>,
    pub breed: Option<String>,
    pub notes: Option<String>,
    /// Date the weight was taken, defaults to today
    pub weighed_on: Option<NaiveDate>,
}

/// Input for moving an animal out of the program
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteFatteningInput {
    pub status: FatteningStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_weight: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub notes: Option<String>,
}

/// Result of an intake attempt.
///
/// A taken tag is an expected outcome the user fixes and resubmits, not a
/// failure of the service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Created { record: FatteningRecord },
    DuplicateTag { tag_number: String },
}

/// A record as served to clients, with its rating under the farm thresholds
#[derive(Debug, Clone, Serialize)]
pub struct FatteningView {
    #[serde(flatten)]
    pub record: FatteningRecord,
    pub gain_rating: GainRating,
    pub progress_percent: Option<Decimal>,
}

fn required(field: &'static str, value: Option<Decimal>) -> Result<Decimal, FieldViolation> {
    value.ok_or(FieldViolation::new(field, "Value is required"))
}

impl FatteningService {
    /// Create a new FatteningService instance
    pub fn new(
        repo: Arc<dyn FatteningRepository>,
        changes: ChangeFeed,
        thresholds: AnalyticsThresholds,
    ) -> Self {
        Self {
            repo,
            changes,
            thresholds,
        }
    }

    /// Attach the gain rating and progress to a record
    pub fn view(&self, record: FatteningRecord) -> FatteningView {
        FatteningView {
            gain_rating: self.thresholds.rate_daily_gain(record.daily_gain),
            progress_percent: record.progress_percent(),
            record,
        }
    }

    /// List all records for a farm
    pub async fn list(&self, farm_id: Uuid) -> AppResult<Vec<FatteningRecord>> {
        self.repo.list(farm_id).await
    }

    /// Get a record by ID
    pub async fn get(&self, farm_id: Uuid, id: Uuid) -> AppResult<FatteningRecord> {
        self.repo
            .get(farm_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Fattening record".to_string()))
    }

    /// Register an animal. Validation runs before anything is written.
    pub async fn create(
        &self,
        farm_id: Uuid,
        input: CreateFatteningInput,
        today: NaiveDate,
    ) -> AppResult<IntakeOutcome> {
        let entry_weight = required("entry_weight", input.entry_weight)?;
        let target_weight = required("target_weight", input.target_weight)?;
        let current_weight = input.current_weight.unwrap_or(entry_weight);
        let tag_number = input.tag_number.trim().to_string();

        validate_fattening_intake(&tag_number, entry_weight, current_weight, target_weight)?;

        let entry_date = input.entry_date.unwrap_or(today);
        if entry_date > today {
            return Err(FieldViolation::new("entry_date", "Entry date cannot be in the future").into());
        }

        let breed = input
            .breed
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| UNKNOWN_BREED.to_string());

        let now = Utc::now();
        let mut record = FatteningRecord {
            id: Uuid::new_v4(),
            farm_id,
            tag_number,
            breed,
            entry_date,
            entry_weight,
            current_weight,
            target_weight,
            daily_gain: None,
            expected_completion_date: None,
            status: FatteningStatus::Active,
            exit_date: None,
            exit_weight: None,
            sale_price: None,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        record.refresh_projection(today);

        if !self.repo.insert_if_tag_available(&record).await? {
            tracing::info!(
                "Rejected intake for farm {}: tag {} is already active",
                farm_id,
                record.tag_number
            );
            return Ok(IntakeOutcome::DuplicateTag {
                tag_number: record.tag_number,
            });
        }

        tracing::info!("Registered {} ({}) for farm {}", record.tag_number, record.breed, farm_id);
        self.notify(farm_id);
        Ok(IntakeOutcome::Created { record })
    }

    /// Record a new weighing. Gain and projection are recomputed from the
    /// stored intake date, intake weight and target.
    pub async fn update(
        &self,
        farm_id: Uuid,
        id: Uuid,
        input: UpdateFatteningInput,
        today: NaiveDate,
    ) -> AppResult<FatteningRecord> {
        let mut record = self.get(farm_id, id).await?;

        if record.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Record {} is {} and can no longer be updated",
                record.tag_number, record.status
            )));
        }

        if let Some(weight) = input.current_weight {
            validate_weight("current_weight", weight)?;
        }
        if let Some(weight) = input.target_weight {
            validate_weight("target_weight", weight)?;
        }

        let weighed_on = input.weighed_on.unwrap_or(today);
        if weighed_on < record.entry_date {
            return Err(FieldViolation::new("weighed_on", "Weighing date is before intake").into());
        }
        if weighed_on > today {
            return Err(FieldViolation::new("weighed_on", "Weighing date cannot be in the future").into());
        }

        let weights_changed = input.current_weight.is_some() || input.target_weight.is_some();
        if let Some(weight) = input.current_weight {
            record.current_weight = weight;
        }
        if let Some(weight) = input.target_weight {
            record.target_weight = weight;
        }
        if let Some(breed) = input.breed.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()) {
            record.breed = breed;
        }
        if input.notes.is_some() {
            record.notes = input.notes;
        }
        if weights_changed {
            record.refresh_projection(weighed_on);
        }
        record.updated_at = Utc::now();

        self.save(&record).await?;
        tracing::debug!(
            "Updated {}: current {} kg, daily gain {:?}",
            record.tag_number,
            record.current_weight,
            record.daily_gain
        );
        self.notify(farm_id);
        Ok(record)
    }

    /// Move an active animal to a terminal status
    pub async fn complete(
        &self,
        farm_id: Uuid,
        id: Uuid,
        input: CompleteFatteningInput,
        today: NaiveDate,
    ) -> AppResult<FatteningRecord> {
        if !input.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(
                "Completion requires a sold, transferred or other status".to_string(),
            ));
        }

        let mut record = self.get(farm_id, id).await?;
        if record.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "Record {} is already {}",
                record.tag_number, record.status
            )));
        }

        if let Some(weight) = input.exit_weight {
            validate_weight("exit_weight", weight)?;
        }
        validate_sale_price(input.sale_price)?;

        let exit_date = input.exit_date.unwrap_or(today);
        if exit_date < record.entry_date {
            return Err(FieldViolation::new("exit_date", "Exit date is before intake").into());
        }

        record.status = input.status;
        record.exit_date = Some(exit_date);
        record.exit_weight = input.exit_weight;
        record.sale_price = input.sale_price;
        if input.notes.is_some() {
            record.notes = input.notes;
        }
        record.updated_at = Utc::now();

        self.save(&record).await?;
        tracing::info!("Completed {} as {}", record.tag_number, record.status);
        self.notify(farm_id);
        Ok(record)
    }

    /// Delete a record
    pub async fn delete(&self, farm_id: Uuid, id: Uuid) -> AppResult<()> {
        if !self.repo.delete(farm_id, id).await? {
            return Err(AppError::NotFound("Fattening record".to_string()));
        }
        self.notify(farm_id);
        Ok(())
    }

    /// Herd analytics recomputed from every record of the farm
    pub async fn analytics(&self, farm_id: Uuid) -> AppResult<FatteningAnalytics> {
        let records = self.repo.list(farm_id).await?;
        Ok(aggregate(&records, &self.thresholds))
    }

    async fn save(&self, record: &FatteningRecord) -> AppResult<()> {
        if !self.repo.update(record).await? {
            return Err(AppError::NotFound("Fattening record".to_string()));
        }
        Ok(())
    }

    fn notify(&self, farm_id: Uuid) {
        self.changes.publish(ChangeEvent {
            table: ChangeTable::CattleFattening,
            farm_id,
        });
    }
}
