//! Display helpers for dashboard values
//!
//! Every helper renders a missing value as `N/A`.

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub const NOT_AVAILABLE: &str = "N/A";

/// Whole days between two dates, negative when `to` is before `from`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn format_weight_kg(weight: Option<Decimal>) -> String {
    match weight {
        Some(w) => format!("{} kg", w.round_dp(1)),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_volume_liters(volume: Option<Decimal>) -> String {
    match volume {
        Some(v) => format!("{} L", v.round_dp(0)),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_percent(percent: Option<Decimal>) -> String {
    match percent {
        Some(p) => format!("{}%", p.round_dp(1)),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_daily_gain(gain: Option<Decimal>) -> String {
    match gain {
        Some(g) => format!("{} kg/day", g.round_dp(2)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// ISO-8601 date, e.g. `2024-05-30`
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `2h 15m` style countdown; zero or negative renders as `expired`
pub fn format_time_remaining(minutes: i64) -> String {
    if minutes <= 0 {
        return "expired".to_string();
    }
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours == 0 {
        format!("{}m", rest)
    } else {
        format!("{}h {}m", hours, rest)
    }
}
