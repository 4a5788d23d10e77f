//! Weather conditions and their effect on strike rolls
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::dice::roll;

/// Weather over the theater for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Weather {
    #[default]
    Clear,
    Overcast,
    Rain,
    Storm,
}

impl Weather {
    /// Check if weather spoils visibility over the target
    #[must_use]
    pub const fn is_poor(self) -> bool {
        matches!(self, Self::Rain | Self::Storm)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Overcast => "overcast",
            Self::Rain => "rain",
            Self::Storm => "storm",
        }
    }
}

pub const WEATHER_ORDER: [Weather; 4] = [
    Weather::Clear,
    Weather::Overcast,
    Weather::Rain,
    Weather::Storm,
];

/// Strike modifiers and roll weights per weather state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "WeatherConfig::default_modifiers")]
    pub modifiers: HashMap<Weather, i32>,
    #[serde(default = "WeatherConfig::default_weights")]
    pub weights: HashMap<Weather, u32>,
}

impl WeatherConfig {
    fn default_modifiers() -> HashMap<Weather, i32> {
        HashMap::from([
            (Weather::Clear, 0),
            (Weather::Overcast, 0),
            (Weather::Rain, -1),
            (Weather::Storm, -2),
        ])
    }

    fn default_weights() -> HashMap<Weather, u32> {
        HashMap::from([
            (Weather::Clear, 5),
            (Weather::Overcast, 3),
            (Weather::Rain, 2),
            (Weather::Storm, 1),
        ])
    }

    /// Strike roll modifier; weather without an entry is neutral.
    #[must_use]
    pub fn modifier(&self, weather: Weather) -> i32 {
        self.modifiers.get(&weather).copied().unwrap_or(0)
    }

    fn weight(&self, weather: Weather) -> u32 {
        self.weights.get(&weather).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_weight(&self) -> u32 {
        WEATHER_ORDER.iter().map(|weather| self.weight(*weather)).sum()
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            modifiers: Self::default_modifiers(),
            weights: Self::default_weights(),
        }
    }
}

/// Roll the turn's weather from the configured weights.
pub fn roll_weather<R: RngCore + ?Sized>(cfg: &WeatherConfig, rng: &mut R) -> Weather {
    let total = cfg.total_weight();
    if total == 0 {
        return Weather::Clear;
    }
    let mut remaining = roll(rng, total);
    for weather in WEATHER_ORDER {
        let weight = cfg.weight(weather);
        if remaining <= weight {
            return weather;
        }
        remaining -= weight;
    }
    Weather::Clear
}
