//! Storage seams for the farm services
//!
//! Services only see these traits. PostgreSQL backs them in production and
//! the in-memory implementations back tests and local runs.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{FatteningRecord, MilkReceptionRecord, TankNumber};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryFatteningRepository, InMemoryMilkReceptionRepository};
pub use postgres::{PgFatteningRepository, PgMilkReceptionRepository};

/// Persistence for cattle fattening records
#[async_trait]
pub trait FatteningRepository: Send + Sync {
    /// All records of a farm, newest intake first
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<FatteningRecord>>;

    async fn get(&self, farm_id: Uuid, id: Uuid) -> AppResult<Option<FatteningRecord>>;

    /// Insert unless an active record of the same farm already carries the
    /// tag. The check and the insert happen as one step.
    ///
    /// Returns false when the tag is taken.
    async fn insert_if_tag_available(&self, record: &FatteningRecord) -> AppResult<bool>;

    /// Overwrite the mutable fields. Returns false when the record is gone.
    async fn update(&self, record: &FatteningRecord) -> AppResult<bool>;

    async fn delete(&self, farm_id: Uuid, id: Uuid) -> AppResult<bool>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> AppResult<()>;
}

/// Persistence for milk reception deltas and tank capacity overrides
#[async_trait]
pub trait MilkReceptionRepository: Send + Sync {
    /// All deltas of a farm in submission order
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<MilkReceptionRecord>>;

    /// Append deltas; either all of them are stored or none
    async fn insert_all(&self, records: &[MilkReceptionRecord]) -> AppResult<()>;

    /// Per-farm capacity overrides from `storage_tanks`
    async fn tank_capacities(&self, farm_id: Uuid) -> AppResult<Vec<(TankNumber, Decimal)>>;

    async fn set_tank_capacity(
        &self,
        farm_id: Uuid,
        tank: TankNumber,
        capacity: Decimal,
    ) -> AppResult<()>;
}
