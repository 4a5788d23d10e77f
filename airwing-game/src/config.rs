//! Engine tuning loaded from JSON.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::weather::WeatherConfig;

/// Errors raised when engine configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config JSON parse error: {0}")]
    Parse(String),
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
}

/// Tuning knobs for mission assignment and strike estimates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Highest hit count reported by strike estimates.
    #[serde(default = "EngineConfig::default_max_hits")]
    pub max_hits: u32,
    /// Roll modifier applied to every strike before conditions.
    #[serde(default)]
    pub base_modifier: i32,
    /// Extra roll modifier against ships caught in port.
    #[serde(default = "EngineConfig::default_in_port_bonus")]
    pub in_port_bonus: i32,
    /// Turns a mission may take to reach its target when it is assigned.
    #[serde(default = "EngineConfig::default_max_mission_turns")]
    pub max_mission_turns: u32,
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl EngineConfig {
    #[must_use]
    pub const fn default_max_hits() -> u32 {
        8
    }

    #[must_use]
    pub const fn default_in_port_bonus() -> i32 {
        1
    }

    #[must_use]
    pub const fn default_max_mission_turns() -> u32 {
        3
    }

    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the JSON cannot be parsed or a value is out of bounds.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::RangeViolation` for the first field outside its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_hits", i64::from(self.max_hits), 1, 12)?;
        check_range("base_modifier", i64::from(self.base_modifier), -6, 6)?;
        check_range("in_port_bonus", i64::from(self.in_port_bonus), -6, 6)?;
        check_range("max_mission_turns", i64::from(self.max_mission_turns), 1, 20)?;
        for (weather, modifier) in &self.weather.modifiers {
            if !(-6..=6).contains(modifier) {
                return Err(ConfigError::RangeViolation {
                    field: weather.label(),
                    min: -6,
                    max: 6,
                    value: i64::from(*modifier),
                });
            }
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hits: Self::default_max_hits(),
            base_modifier: 0,
            in_port_bonus: Self::default_in_port_bonus(),
            max_mission_turns: Self::default_max_mission_turns(),
            weather: WeatherConfig::default(),
        }
    }
}
