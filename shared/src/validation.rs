//! Validation utilities for intake and reception input
//!
//! Validation runs before any write. A failure names the offending field.

use rust_decimal::Decimal;
use thiserror::Error;

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// Maximum tag length accepted on intake
pub const MAX_TAG_LENGTH: usize = 32;

/// Weights, volumes and prices are stored with two decimal places
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// Exclusive upper bound for weights in kg
pub const MAX_WEIGHT_KG: i64 = 100_000_000;

/// Exclusive upper bound for a single volume or capacity in litres
pub const MAX_VOLUME_LITERS: i64 = 10_000_000_000;

/// Exclusive upper bound for a sale price
pub const MAX_SALE_PRICE: i64 = 1_000_000_000_000;

fn has_excess_scale(value: Decimal) -> bool {
    value.normalize().scale() > MAX_DECIMAL_PLACES
}

/// Reject values with more than two decimal places or a magnitude at or
/// above `limit`
fn validate_storable(
    field: &'static str,
    value: Decimal,
    limit: i64,
) -> Result<(), FieldViolation> {
    if has_excess_scale(value) {
        return Err(FieldViolation::new(field, "At most two decimal places are allowed"));
    }
    if value.abs() >= Decimal::from(limit) {
        return Err(FieldViolation::new(field, "Value is too large"));
    }
    Ok(())
}

// ============================================================================
// Fattening Validations
// ============================================================================

/// Validate an ear tag (non-blank, bounded length)
pub fn validate_tag_number(tag: &str) -> Result<(), FieldViolation> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(FieldViolation::new("tag_number", "Tag number is required"));
    }
    if tag.chars().count() > MAX_TAG_LENGTH {
        return Err(FieldViolation::new("tag_number", "Tag number is too long"));
    }
    Ok(())
}

/// Validate a weight in kg is strictly positive and storable
pub fn validate_weight(field: &'static str, weight: Decimal) -> Result<(), FieldViolation> {
    if weight <= Decimal::ZERO {
        return Err(FieldViolation::new(field, "Weight must be greater than zero"));
    }
    validate_storable(field, weight, MAX_WEIGHT_KG)
}

/// Validate all required intake fields
pub fn validate_fattening_intake(
    tag_number: &str,
    entry_weight: Decimal,
    current_weight: Decimal,
    target_weight: Decimal,
) -> Result<(), FieldViolation> {
    validate_tag_number(tag_number)?;
    validate_weight("entry_weight", entry_weight)?;
    validate_weight("current_weight", current_weight)?;
    validate_weight("target_weight", target_weight)?;
    Ok(())
}

/// Validate an optional sale price is not negative
pub fn validate_sale_price(price: Option<Decimal>) -> Result<(), FieldViolation> {
    match price {
        Some(p) if p < Decimal::ZERO => Err(FieldViolation::new(
            "sale_price",
            "Sale price cannot be negative",
        )),
        Some(p) => validate_storable("sale_price", p, MAX_SALE_PRICE),
        None => Ok(()),
    }
}

// ============================================================================
// Milk Reception Validations
// ============================================================================

/// A reception delta must move some volume
pub fn validate_milk_volume(volume: Decimal) -> Result<(), FieldViolation> {
    if volume.is_zero() {
        return Err(FieldViolation::new("milk_volume", "Volume cannot be zero"));
    }
    validate_storable("milk_volume", volume, MAX_VOLUME_LITERS)
}

/// A transfer moves a positive volume
pub fn validate_transfer_volume(volume: Decimal) -> Result<(), FieldViolation> {
    if volume <= Decimal::ZERO {
        return Err(FieldViolation::new("volume", "Transfer volume must be positive"));
    }
    validate_storable("volume", volume, MAX_VOLUME_LITERS)
}

/// A tank capacity override is a positive, storable volume
pub fn validate_tank_capacity(capacity: Decimal) -> Result<(), FieldViolation> {
    if capacity <= Decimal::ZERO {
        return Err(FieldViolation::new("capacity_liters", "Capacity must be positive"));
    }
    validate_storable("capacity_liters", capacity, MAX_VOLUME_LITERS)
}
