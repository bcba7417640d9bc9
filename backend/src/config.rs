//! Configuration management for the Farm Operations Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides such as FARM__SERVER__PORT

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{AnalyticsThresholds, FreshnessPolicy, TankCapacities, UtilizationPolicy};

/// Longest freshness window accepted, one week
const MAX_FRESHNESS_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Which repository implementation backs the services
    pub storage: StorageConfig,

    /// Fattening analytics thresholds
    pub fattening: FatteningConfig,

    /// Milk tank capacities and alerting policy
    pub milk: MilkConfig,

    /// Change notification channel
    pub changes: ChangesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FatteningConfig {
    /// Daily gain (kg/day) above which an animal is rated high
    pub high_daily_gain_kg: Decimal,

    /// Average breed gain (kg) above which a breed is a strong performer
    pub strong_breed_gain_kg: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MilkConfig {
    /// Default Tank A capacity in litres
    pub tank_a_capacity_liters: Decimal,

    /// Default Tank B capacity in litres
    pub tank_b_capacity_liters: Decimal,

    pub warning_percent: Decimal,

    pub critical_percent: Decimal,

    /// How long milk may wait in direct processing
    pub freshness_window_minutes: i64,

    /// Remaining minutes below which a freshness alert is urgent
    pub urgent_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChangesConfig {
    /// Buffered events per subscriber before it lags
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FARM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "postgres")?
            .set_default("fattening.high_daily_gain_kg", "0.8")?
            .set_default("fattening.strong_breed_gain_kg", "40")?
            .set_default("milk.tank_a_capacity_liters", "5000")?
            .set_default("milk.tank_b_capacity_liters", "5000")?
            .set_default("milk.warning_percent", "70")?
            .set_default("milk.critical_percent", "90")?
            .set_default("milk.freshness_window_minutes", 180)?
            .set_default("milk.urgent_minutes", 60)?
            .set_default("changes.channel_capacity", 256)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FARM__SECTION__KEY)
            .add_source(
                Environment::with_prefix("FARM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required for the postgres storage backend".to_string(),
            ));
        }
        if self.milk.tank_a_capacity_liters <= Decimal::ZERO
            || self.milk.tank_b_capacity_liters <= Decimal::ZERO
        {
            return Err(ConfigError::Message(
                "milk tank capacities must be positive".to_string(),
            ));
        }
        if self.milk.warning_percent < Decimal::ZERO
            || self.milk.critical_percent > Decimal::ONE_HUNDRED
        {
            return Err(ConfigError::Message(
                "milk utilization thresholds must lie between 0 and 100".to_string(),
            ));
        }
        if self.milk.warning_percent > self.milk.critical_percent {
            return Err(ConfigError::Message(
                "milk.warning_percent must not exceed milk.critical_percent".to_string(),
            ));
        }
        if self.milk.freshness_window_minutes <= 0
            || self.milk.freshness_window_minutes > MAX_FRESHNESS_WINDOW_MINUTES
        {
            return Err(ConfigError::Message(format!(
                "milk.freshness_window_minutes must be between 1 and {}",
                MAX_FRESHNESS_WINDOW_MINUTES
            )));
        }
        if self.milk.urgent_minutes < 0
            || self.milk.urgent_minutes > self.milk.freshness_window_minutes
        {
            return Err(ConfigError::Message(
                "milk.urgent_minutes must be between 0 and milk.freshness_window_minutes"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl FatteningConfig {
    pub fn thresholds(&self) -> AnalyticsThresholds {
        AnalyticsThresholds {
            high_daily_gain_kg: self.high_daily_gain_kg,
            strong_breed_gain_kg: self.strong_breed_gain_kg,
        }
    }
}

impl MilkConfig {
    pub fn capacities(&self) -> TankCapacities {
        TankCapacities {
            tank_a: self.tank_a_capacity_liters,
            tank_b: self.tank_b_capacity_liters,
        }
    }

    pub fn utilization_policy(&self) -> UtilizationPolicy {
        UtilizationPolicy {
            warning_percent: self.warning_percent,
            critical_percent: self.critical_percent,
        }
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy {
            window_minutes: self.freshness_window_minutes,
            urgent_minutes: self.urgent_minutes,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for Config {
    /// In-memory development defaults, used by tests
    fn default() -> Self {
        let thresholds = AnalyticsThresholds::default();
        let capacities = TankCapacities::default();
        let utilization = UtilizationPolicy::default();
        let freshness = FreshnessPolicy::default();
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                min_connections: 2,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            fattening: FatteningConfig {
                high_daily_gain_kg: thresholds.high_daily_gain_kg,
                strong_breed_gain_kg: thresholds.strong_breed_gain_kg,
            },
            milk: MilkConfig {
                tank_a_capacity_liters: capacities.tank_a,
                tank_b_capacity_liters: capacities.tank_b,
                warning_percent: utilization.warning_percent,
                critical_percent: utilization.critical_percent,
                freshness_window_minutes: freshness.window_minutes,
                urgent_minutes: freshness.urgent_minutes,
            },
            changes: ChangesConfig {
                channel_capacity: 256,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_memory_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
        assert_eq!(config.milk.capacities(), TankCapacities::default());
        assert_eq!(config.milk.freshness_policy(), FreshnessPolicy::default());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Postgres;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.warning_percent = Decimal::from(95);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_milk_policy() {
        let mut config = Config::default();
        config.milk.tank_a_capacity_liters = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.tank_b_capacity_liters = Decimal::from(-5000);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.critical_percent = Decimal::from(150);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.freshness_window_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.freshness_window_minutes = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.urgent_minutes = 240;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.urgent_minutes = -1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.milk.freshness_window_minutes = MAX_FRESHNESS_WINDOW_MINUTES;
        config.milk.urgent_minutes = MAX_FRESHNESS_WINDOW_MINUTES;
        assert!(config.validate().is_ok());
    }
}
