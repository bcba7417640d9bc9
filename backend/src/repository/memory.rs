//! In-memory repositories for tests and database-free local runs

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{FatteningRecord, FatteningStatus, MilkReceptionRecord, TankNumber};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FatteningRepository, MilkReceptionRepository};
use crate::error::AppResult;

#[derive(Default)]
pub struct InMemoryFatteningRepository {
    records: RwLock<HashMap<Uuid, FatteningRecord>>,
}

impl InMemoryFatteningRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FatteningRepository for InMemoryFatteningRepository {
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<FatteningRecord>> {
        let records = self.records.read().await;
        let mut farm_records: Vec<FatteningRecord> = records
            .values()
            .filter(|r| r.farm_id == farm_id)
            .cloned()
            .collect();
        farm_records.sort_by(|a, b| {
            b.entry_date
                .cmp(&a.entry_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(farm_records)
    }

    async fn get(&self, farm_id: Uuid, id: Uuid) -> AppResult<Option<FatteningRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).filter(|r| r.farm_id == farm_id).cloned())
    }

    async fn insert_if_tag_available(&self, record: &FatteningRecord) -> AppResult<bool> {
        // The write lock spans the check and the insert
        let mut records = self.records.write().await;
        let taken = records.values().any(|r| {
            r.farm_id == record.farm_id
                && r.status == FatteningStatus::Active
                && r.tag_number == record.tag_number
        });
        if taken {
            return Ok(false);
        }
        records.insert(record.id, record.clone());
        Ok(true)
    }

    async fn update(&self, record: &FatteningRecord) -> AppResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) if existing.farm_id == record.farm_id => {
                *existing = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, farm_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut records = self.records.write().await;
        if records.get(&id).is_some_and(|r| r.farm_id == farm_id) {
            records.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMilkReceptionRepository {
    records: RwLock<Vec<MilkReceptionRecord>>,
    capacities: RwLock<HashMap<(Uuid, TankNumber), Decimal>>,
}

impl InMemoryMilkReceptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MilkReceptionRepository for InMemoryMilkReceptionRepository {
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<MilkReceptionRecord>> {
        let records = self.records.read().await;
        let mut farm_records: Vec<MilkReceptionRecord> = records
            .iter()
            .filter(|r| r.farm_id == farm_id)
            .cloned()
            .collect();
        farm_records.sort_by_key(|r| r.created_at);
        Ok(farm_records)
    }

    async fn insert_all(&self, new_records: &[MilkReceptionRecord]) -> AppResult<()> {
        let mut records = self.records.write().await;
        records.extend_from_slice(new_records);
        Ok(())
    }

    async fn tank_capacities(&self, farm_id: Uuid) -> AppResult<Vec<(TankNumber, Decimal)>> {
        let capacities = self.capacities.read().await;
        let mut overrides: Vec<(TankNumber, Decimal)> = capacities
            .iter()
            .filter(|((farm, _), _)| *farm == farm_id)
            .map(|((_, tank), capacity)| (*tank, *capacity))
            .collect();
        overrides.sort_by_key(|(tank, _)| *tank);
        Ok(overrides)
    }

    async fn set_tank_capacity(
        &self,
        farm_id: Uuid,
        tank: TankNumber,
        capacity: Decimal,
    ) -> AppResult<()> {
        self.capacities.write().await.insert((farm_id, tank), capacity);
        Ok(())
    }
}
