//! Mission targets and their lazy resolution.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::grid::GridRef;
use crate::squadron::TargetClass;
use crate::variant::MissionVariant;
use crate::weather::Weather;

/// Side a mission flies for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nation(pub String);

impl Nation {
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Display for Nation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a target as seen by a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub name: String,
    pub class: TargetClass,
    pub location: GridRef,
    /// Anti-aircraft rating of the defences over the target.
    #[serde(default)]
    pub anti_air: u32,
    /// Ships are berthed rather than under way.
    #[serde(default)]
    pub in_port: bool,
    /// Free squadron slots, for ferry destinations.
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub region: Option<String>,
}

impl TargetRef {
    #[must_use]
    pub fn new(name: &str, class: TargetClass, location: &str) -> Self {
        Self {
            name: name.to_string(),
            class,
            location: GridRef::new(location),
            anti_air: 0,
            in_port: false,
            capacity: 0,
            region: None,
        }
    }
}

/// Lookup of targets visible to a nation for a mission variant.
pub trait TargetDirectory {
    fn find(&self, name: &str, variant: MissionVariant, nation: &Nation) -> Option<TargetRef>;
}

/// In-memory directory keyed by nation then target name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleTargets {
    targets: HashMap<Nation, Vec<TargetRef>>,
}

impl VisibleTargets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a target visible to a nation, replacing any entry of the same name.
    pub fn reveal(&mut self, nation: &Nation, target: TargetRef) {
        let list = self.targets.entry(nation.clone()).or_default();
        list.retain(|existing| existing.name != target.name);
        list.push(target);
    }

    /// Remove a target from every nation's view, e.g. once it is sunk or captured.
    pub fn withdraw(&mut self, name: &str) {
        for list in self.targets.values_mut() {
            list.retain(|existing| existing.name != name);
        }
    }
}

impl TargetDirectory for VisibleTargets {
    fn find(&self, name: &str, variant: MissionVariant, nation: &Nation) -> Option<TargetRef> {
        self.targets
            .get(nation)?
            .iter()
            .find(|target| target.name == name && variant.accepts(target.class))
            .cloned()
    }
}

/// Memoized target reference: resolved at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSlot {
    Unresolved(String),
    Resolved(TargetRef),
    Missing(String),
}

impl TargetSlot {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::Unresolved(name.to_string())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unresolved(name) | Self::Missing(name) => name,
            Self::Resolved(target) => &target.name,
        }
    }

    /// Resolve through the directory on first use; later calls reuse the outcome.
    pub fn resolve(
        &mut self,
        directory: &dyn TargetDirectory,
        variant: MissionVariant,
        nation: &Nation,
    ) -> Option<&TargetRef> {
        if let Self::Unresolved(name) = self {
            let name = std::mem::take(name);
            *self = match directory.find(&name, variant, nation) {
                Some(target) => Self::Resolved(target),
                None => Self::Missing(name),
            };
        }
        self.resolved()
    }

    #[must_use]
    pub const fn resolved(&self) -> Option<&TargetRef> {
        match self {
            Self::Resolved(target) => Some(target),
            Self::Unresolved(_) | Self::Missing(_) => None,
        }
    }
}

/// Derives the steps turned away by defences over a target.
pub trait AntiAirModel {
    fn turned_away_steps(&self, target: &TargetRef, weather: Weather) -> u32;
}

/// Uses the target's anti-aircraft rating, less one in storms.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetRatingAntiAir;

impl AntiAirModel for TargetRatingAntiAir {
    fn turned_away_steps(&self, target: &TargetRef, weather: Weather) -> u32 {
        if matches!(weather, Weather::Storm) {
            target.anti_air.saturating_sub(1)
        } else {
            target.anti_air
        }
    }
}
