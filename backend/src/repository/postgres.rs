//! PostgreSQL repositories and the `LISTEN` bridge into the change feed

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{FatteningRecord, MilkReceptionRecord, TankNumber};
use sqlx::{postgres::PgListener, FromRow, PgPool};
use uuid::Uuid;

use super::{FatteningRepository, MilkReceptionRepository};
use crate::error::{AppError, AppResult};
use crate::services::change_feed::{ChangeEvent, ChangeFeed};

/// Channel the table triggers notify on (see migrations)
pub const CHANGE_CHANNEL: &str = "farm_changes";

#[derive(Clone)]
pub struct PgFatteningRepository {
    db: PgPool,
}

impl PgFatteningRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Row for fattening queries
#[derive(Debug, FromRow)]
struct FatteningRow {
    id: Uuid,
    farm_id: Uuid,
    tag_number: String,
    breed: String,
    entry_date: NaiveDate,
    entry_weight: Decimal,
    current_weight: Decimal,
    target_weight: Decimal,
    daily_gain: Option<Decimal>,
    expected_completion_date: Option<NaiveDate>,
    status: String,
    exit_date: Option<NaiveDate>,
    exit_weight: Option<Decimal>,
    sale_price: Option<Decimal>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FatteningRow> for FatteningRecord {
    type Error = AppError;

    fn try_from(row: FatteningRow) -> Result<Self, Self::Error> {
        Ok(FatteningRecord {
            id: row.id,
            farm_id: row.farm_id,
            tag_number: row.tag_number,
            breed: row.breed,
            entry_date: row.entry_date,
            entry_weight: row.entry_weight,
            current_weight: row.current_weight,
            target_weight: row.target_weight,
            daily_gain: row.daily_gain,
            expected_completion_date: row.expected_completion_date,
            status: row.status.parse().map_err(AppError::StorageError)?,
            exit_date: row.exit_date,
            exit_weight: row.exit_weight,
            sale_price: row.sale_price,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const FATTENING_COLUMNS: &str = "id, farm_id, tag_number, breed, entry_date, entry_weight, \
     current_weight, target_weight, daily_gain, expected_completion_date, status, exit_date, \
     exit_weight, sale_price, notes, created_at, updated_at";

#[async_trait]
impl FatteningRepository for PgFatteningRepository {
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<FatteningRecord>> {
        let rows = sqlx::query_as::<_, FatteningRow>(&format!(
            "SELECT {} FROM cattle_fattening WHERE farm_id = $1 \
             ORDER BY entry_date DESC, created_at DESC",
            FATTENING_COLUMNS
        ))
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(FatteningRecord::try_from).collect()
    }

    async fn get(&self, farm_id: Uuid, id: Uuid) -> AppResult<Option<FatteningRecord>> {
        let row = sqlx::query_as::<_, FatteningRow>(&format!(
            "SELECT {} FROM cattle_fattening WHERE id = $1 AND farm_id = $2",
            FATTENING_COLUMNS
        ))
        .bind(id)
        .bind(farm_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(FatteningRecord::try_from).transpose()
    }

    async fn insert_if_tag_available(&self, record: &FatteningRecord) -> AppResult<bool> {
        // Partial unique index on (farm_id, tag_number) WHERE status = 'active'
        let result = sqlx::query(
            r#"
            INSERT INTO cattle_fattening (
                id, farm_id, tag_number, breed, entry_date, entry_weight, current_weight,
                target_weight, daily_gain, expected_completion_date, status, notes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (farm_id, tag_number) WHERE status = 'active' DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(record.farm_id)
        .bind(&record.tag_number)
        .bind(&record.breed)
        .bind(record.entry_date)
        .bind(record.entry_weight)
        .bind(record.current_weight)
        .bind(record.target_weight)
        .bind(record.daily_gain)
        .bind(record.expected_completion_date)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, record: &FatteningRecord) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cattle_fattening
            SET breed = $3, current_weight = $4, target_weight = $5, daily_gain = $6,
                expected_completion_date = $7, status = $8, exit_date = $9, exit_weight = $10,
                sale_price = $11, notes = $12, updated_at = $13
            WHERE id = $1 AND farm_id = $2
            "#,
        )
        .bind(record.id)
        .bind(record.farm_id)
        .bind(&record.breed)
        .bind(record.current_weight)
        .bind(record.target_weight)
        .bind(record.daily_gain)
        .bind(record.expected_completion_date)
        .bind(record.status.as_str())
        .bind(record.exit_date)
        .bind(record.exit_weight)
        .bind(record.sale_price)
        .bind(&record.notes)
        .bind(record.updated_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, farm_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM cattle_fattening WHERE id = $1 AND farm_id = $2")
            .bind(id)
            .bind(farm_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMilkReceptionRepository {
    db: PgPool,
}

impl PgMilkReceptionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Row for milk reception queries
#[derive(Debug, FromRow)]
struct MilkReceptionRow {
    id: Uuid,
    farm_id: Uuid,
    tank_number: String,
    milk_volume: Decimal,
    supplier_name: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MilkReceptionRow> for MilkReceptionRecord {
    type Error = AppError;

    fn try_from(row: MilkReceptionRow) -> Result<Self, Self::Error> {
        Ok(MilkReceptionRecord {
            id: row.id,
            farm_id: row.farm_id,
            tank_number: row.tank_number.parse().map_err(AppError::StorageError)?,
            milk_volume: row.milk_volume,
            supplier_name: row.supplier_name,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl MilkReceptionRepository for PgMilkReceptionRepository {
    async fn list(&self, farm_id: Uuid) -> AppResult<Vec<MilkReceptionRecord>> {
        let rows = sqlx::query_as::<_, MilkReceptionRow>(
            r#"
            SELECT id, farm_id, tank_number, milk_volume, supplier_name, notes, created_at
            FROM milk_reception
            WHERE farm_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MilkReceptionRecord::try_from).collect()
    }

    async fn insert_all(&self, records: &[MilkReceptionRecord]) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO milk_reception (
                    id, farm_id, tank_number, milk_volume, supplier_name, notes, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(record.id)
            .bind(record.farm_id)
            .bind(record.tank_number.as_str())
            .bind(record.milk_volume)
            .bind(&record.supplier_name)
            .bind(&record.notes)
            .bind(record.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn tank_capacities(&self, farm_id: Uuid) -> AppResult<Vec<(TankNumber, Decimal)>> {
        let rows = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT tank_number, capacity_liters FROM storage_tanks WHERE farm_id = $1 ORDER BY tank_number",
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|(tank, capacity)| -> AppResult<(TankNumber, Decimal)> {
                let tank = tank.parse::<TankNumber>().map_err(AppError::StorageError)?;
                Ok((tank, capacity))
            })
            .collect()
    }

    async fn set_tank_capacity(
        &self,
        farm_id: Uuid,
        tank: TankNumber,
        capacity: Decimal,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO storage_tanks (farm_id, tank_number, capacity_liters)
            VALUES ($1, $2, $3)
            ON CONFLICT (farm_id, tank_number)
            DO UPDATE SET capacity_liters = EXCLUDED.capacity_liters, updated_at = NOW()
            "#,
        )
        .bind(farm_id)
        .bind(tank.as_str())
        .bind(capacity)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

/// Forward `NOTIFY farm_changes` payloads into the change feed.
///
/// Runs until the listener connection fails; the caller decides whether to
/// restart it.
pub async fn forward_notifications(db: PgPool, feed: ChangeFeed) -> AppResult<()> {
    let mut listener = PgListener::connect_with(&db).await?;
    listener.listen(CHANGE_CHANNEL).await?;
    tracing::info!("Listening for database changes on '{}'", CHANGE_CHANNEL);

    loop {
        let notification = listener.recv().await?;
        match serde_json::from_str::<ChangeEvent>(notification.payload()) {
            Ok(event) => feed.publish(event),
            Err(e) => tracing::warn!(
                "Ignoring malformed change payload '{}': {}",
                notification.payload(),
                e
            ),
        }
    }
}
