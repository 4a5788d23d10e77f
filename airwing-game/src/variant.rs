//! Mission variants and the behavior that differs between them.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::squadron::TargetClass;

/// The kind of flight order a mission carries out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionVariant {
    /// Relocate squadrons to another airbase.
    Ferry,
    LandStrike,
    PortStrike,
    TaskForceStrike,
    AirfieldSweep,
    PortSweep,
    PortRecon,
    /// Standing combat air patrol over a distant task force.
    DistantCap,
}

/// What happens when a mission reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAction {
    /// Fly through the target's defences.
    RunDefences,
    /// Circle the target on patrol.
    Patrol,
    /// Hand the roster over to the destination airbase.
    Transfer,
    /// Observe only.
    Observe,
}

pub const ALL_VARIANTS: [MissionVariant; 8] = [
    MissionVariant::Ferry,
    MissionVariant::LandStrike,
    MissionVariant::PortStrike,
    MissionVariant::TaskForceStrike,
    MissionVariant::AirfieldSweep,
    MissionVariant::PortSweep,
    MissionVariant::PortRecon,
    MissionVariant::DistantCap,
];

impl MissionVariant {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ferry => "ferry",
            Self::LandStrike => "land_strike",
            Self::PortStrike => "port_strike",
            Self::TaskForceStrike => "task_force_strike",
            Self::AirfieldSweep => "airfield_sweep",
            Self::PortSweep => "port_sweep",
            Self::PortRecon => "port_recon",
            Self::DistantCap => "distant_cap",
        }
    }

    /// Target classes this variant may be ordered against.
    #[must_use]
    pub const fn accepts(self, class: TargetClass) -> bool {
        match self {
            Self::Ferry | Self::AirfieldSweep => matches!(class, TargetClass::Airfield),
            Self::LandStrike => matches!(class, TargetClass::Land | TargetClass::Airfield),
            Self::PortStrike | Self::PortSweep | Self::PortRecon => {
                matches!(class, TargetClass::Port)
            }
            Self::TaskForceStrike | Self::DistantCap => matches!(class, TargetClass::TaskForce),
        }
    }

    /// Ferry flights stay at their destination; everything else flies home.
    #[must_use]
    pub const fn is_round_trip(self) -> bool {
        !matches!(self, Self::Ferry)
    }

    #[must_use]
    pub const fn is_strike(self) -> bool {
        matches!(
            self,
            Self::LandStrike | Self::PortStrike | Self::TaskForceStrike
        )
    }

    /// Whether weather modifies this variant's chance of success.
    #[must_use]
    pub const fn is_weather_sensitive(self) -> bool {
        !matches!(self, Self::Ferry | Self::DistantCap)
    }

    #[must_use]
    pub const fn target_action(self) -> TargetAction {
        match self {
            Self::Ferry => TargetAction::Transfer,
            Self::LandStrike
            | Self::PortStrike
            | Self::TaskForceStrike
            | Self::AirfieldSweep
            | Self::PortSweep => TargetAction::RunDefences,
            Self::PortRecon => TargetAction::Observe,
            Self::DistantCap => TargetAction::Patrol,
        }
    }
}

impl fmt::Display for MissionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
