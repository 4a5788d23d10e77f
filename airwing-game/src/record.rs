//! Persisted shapes for missions and airbases.
//!
//! Objects are referenced by name; squadrons, targets, and cells are looked
//! up again when a record is loaded.
use serde::{Deserialize, Serialize};

use crate::grid::GridRef;
use crate::mission::{MissionId, MissionState};
use crate::path::FlightPathRecord;
use crate::roster::RoleAssignment;
use crate::squadron::Squadron;
use crate::target::Nation;
use crate::variant::MissionVariant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub id: MissionId,
    pub variant: MissionVariant,
    pub state: MissionState,
    pub nation: Nation,
    pub origin: String,
    pub target: String,
    /// Where the target stood at launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_location: Option<GridRef>,
    pub roster: RoleAssignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FlightPathRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_turn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turns_to_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turns_to_home: Option<u32>,
    #[serde(default)]
    pub range: u32,
}

/// An airbase with every squadron it owns, on the ground or flying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirbaseRecord {
    pub name: String,
    pub squadrons: Vec<Squadron>,
    #[serde(default)]
    pub missions: Vec<MissionRecord>,
}

/// Whole-theater save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheaterRecord {
    pub turn: u32,
    pub next_mission_id: u32,
    pub airbases: Vec<AirbaseRecord>,
}

impl TheaterRecord {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a theater.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
