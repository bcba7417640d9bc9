//! WebAssembly module for the Farm Operations Platform
//!
//! Provides client-side computation for:
//! - Daily gain and completion projections while weights are being typed
//! - Tank utilization levels and allocation suggestions
//! - Freshness countdowns for direct-processing milk
//! - Dashboard labels for weights, volumes and percentages

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shared::{
    compute_daily_gain, suggest_strategy, utilization_percent, AnalyticsThresholds,
    FatteningRecord, FatteningStatus, FreshnessPolicy, UtilizationPolicy,
};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("farm-operations-wasm loaded"));
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", field, e)))
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

fn to_optional_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(|v| Decimal::try_from(v).ok())
}

/// An unsaved record carrying just what the projections read
fn draft_record(
    entry_date: NaiveDate,
    entry_weight: f64,
    current_weight: f64,
    target_weight: f64,
) -> FatteningRecord {
    let now = Utc::now();
    FatteningRecord {
        id: Uuid::nil(),
        farm_id: Uuid::nil(),
        tag_number: String::new(),
        breed: String::new(),
        entry_date,
        entry_weight: to_decimal(entry_weight),
        current_weight: to_decimal(current_weight),
        target_weight: to_decimal(target_weight),
        daily_gain: None,
        expected_completion_date: None,
        status: FatteningStatus::Active,
        exit_date: None,
        exit_weight: None,
        sale_price: None,
        notes: None,
        created_at: now,
        updated_at: now,
    }
}

/// Daily gain in kg, undefined on the intake day
#[wasm_bindgen]
pub fn calculate_daily_gain(
    entry_date: &str,
    entry_weight: f64,
    current_weight: f64,
    as_of: &str,
) -> Result<Option<f64>, JsValue> {
    let entry = parse_date("entry_date", entry_date)?;
    let as_of = parse_date("as_of", as_of)?;
    let record = draft_record(entry, entry_weight, current_weight, 0.0);
    Ok(compute_daily_gain(&record, as_of).and_then(|g| g.to_f64()))
}

/// Projected completion date (`YYYY-MM-DD`), undefined without a positive gain
#[wasm_bindgen]
pub fn calculate_expected_completion(
    entry_date: &str,
    entry_weight: f64,
    current_weight: f64,
    target_weight: f64,
    as_of: &str,
) -> Result<Option<String>, JsValue> {
    let entry = parse_date("entry_date", entry_date)?;
    let as_of = parse_date("as_of", as_of)?;
    let mut record = draft_record(entry, entry_weight, current_weight, target_weight);
    record.refresh_projection(as_of);
    Ok(record
        .expected_completion_date
        .map(|d| shared::format_date(Some(d))))
}

/// `high`, `normal` or `unavailable` for a daily gain under the default thresholds
#[wasm_bindgen]
pub fn rate_daily_gain(daily_gain: Option<f64>) -> String {
    let rating = AnalyticsThresholds::default().rate_daily_gain(to_optional_decimal(daily_gain));
    serde_json::to_value(rating)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Utilization level of a finite tank with the default thresholds
#[wasm_bindgen]
pub fn classify_tank_utilization(current_volume: f64, capacity: f64) -> String {
    let percent = utilization_percent(to_decimal(current_volume), to_decimal(capacity));
    UtilizationPolicy::default().classify(percent).to_string()
}

/// Allocation strategy as JSON, e.g. `{"strategy":"split","tank_a":"1000","tank_b":"200"}`
#[wasm_bindgen]
pub fn suggest_tank_strategy(
    volume: f64,
    tank_a_remaining: f64,
    tank_b_remaining: f64,
) -> Result<String, JsValue> {
    let strategy = suggest_strategy(
        to_decimal(volume),
        to_decimal(tank_a_remaining),
        to_decimal(tank_b_remaining),
    );
    serde_json::to_string(&strategy)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize strategy: {}", e)))
}

/// Countdown label such as `2h 15m`
#[wasm_bindgen]
pub fn format_countdown(minutes: i32) -> String {
    shared::format_time_remaining(i64::from(minutes))
}

/// `352.5 kg`, or `N/A` when missing
#[wasm_bindgen]
pub fn format_weight_kg(weight: Option<f64>) -> String {
    shared::format_weight_kg(to_optional_decimal(weight))
}

/// `1200 L`, or `N/A` when missing
#[wasm_bindgen]
pub fn format_volume_liters(volume: Option<f64>) -> String {
    shared::format_volume_liters(to_optional_decimal(volume))
}

/// `75%`, or `N/A` when missing
#[wasm_bindgen]
pub fn format_percent(percent: Option<f64>) -> String {
    shared::format_percent(to_optional_decimal(percent))
}

/// `0.83 kg/day`, or `N/A` when missing
#[wasm_bindgen]
pub fn format_daily_gain(gain: Option<f64>) -> String {
    shared::format_daily_gain(to_optional_decimal(gain))
}

/// Whole days from `from` to `to` (both `YYYY-MM-DD`)
#[wasm_bindgen]
pub fn days_between(from: &str, to: &str) -> Result<i32, JsValue> {
    let from = parse_date("from", from)?;
    let to = parse_date("to", to)?;
    i32::try_from(shared::days_between(from, to))
        .map_err(|_| JsValue::from_str("Date range is too long"))
}

/// Whole minutes from `now_ms` until the freshness deadline of milk submitted at `submitted_at_ms`
pub fn minutes_between(submitted_at_ms: f64, now_ms: f64) -> i32 {
    let window_ms = FreshnessPolicy::default().window_minutes as f64 * 60_000.0;
    ((submitted_at_ms + window_ms - now_ms) / 60_000.0).floor() as i32
}

/// Minutes left before direct-processing milk expires, using the browser clock
#[wasm_bindgen]
pub fn minutes_until_deadline(submitted_at_ms: f64) -> i32 {
    minutes_between(submitted_at_ms, js_sys::Date::now())
}
