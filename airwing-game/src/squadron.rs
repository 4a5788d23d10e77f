//! Squadron strength, attack ratings, and readiness.
use serde::{Deserialize, Serialize};

use crate::dice::HitChance;

/// Readiness of a squadron relative to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SquadronState {
    /// In the home airbase pool and free to be assigned.
    #[default]
    Ready,
    /// Held by a mission roster that has not launched.
    Assigned,
    /// In flight with its mission.
    Airborne,
    /// Flying a standing patrol over the mission target.
    Patrolling,
}

impl SquadronState {
    #[must_use]
    pub const fn is_on_mission(self) -> bool {
        !matches!(self, Self::Ready)
    }
}

/// Broad class of target a strike is flown against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    Airfield,
    Port,
    TaskForce,
    Land,
}

impl TargetClass {
    #[must_use]
    pub const fn is_naval(self) -> bool {
        matches!(self, Self::Port | Self::TaskForce)
    }
}

/// Attack dice and the d6 roll needed for each to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRating {
    pub factor: u32,
    pub to_hit: u8,
}

impl AttackRating {
    #[must_use]
    pub const fn new(factor: u32, to_hit: u8) -> Self {
        Self { factor, to_hit }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            factor: 0,
            to_hit: 7,
        }
    }
}

impl Default for AttackRating {
    fn default() -> Self {
        Self::none()
    }
}

/// Attack ratings against land and naval targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttackProfile {
    #[serde(default)]
    pub land: AttackRating,
    #[serde(default)]
    pub naval: AttackRating,
}

impl AttackProfile {
    #[must_use]
    pub const fn rating(&self, class: TargetClass) -> AttackRating {
        if class.is_naval() {
            self.naval
        } else {
            self.land
        }
    }
}

/// A squadron of aircraft based at an airbase, carrier, or capital ship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squadron {
    pub name: String,
    /// Name of the airbase the squadron returns to.
    pub home: String,
    pub model: String,
    /// Grid steps flown per turn.
    pub range: u32,
    pub max_steps: u32,
    steps: u32,
    effective_steps: u32,
    #[serde(default)]
    pub attack: AttackProfile,
    #[serde(default)]
    state: SquadronState,
}

impl Squadron {
    /// Full-strength ready squadron.
    #[must_use]
    pub fn new(name: &str, home: &str, model: &str, range: u32, steps: u32) -> Self {
        Self {
            name: name.to_string(),
            home: home.to_string(),
            model: model.to_string(),
            range,
            max_steps: steps,
            steps,
            effective_steps: steps,
            attack: AttackProfile::default(),
            state: SquadronState::Ready,
        }
    }

    #[must_use]
    pub const fn with_attack(mut self, attack: AttackProfile) -> Self {
        self.attack = attack;
        self
    }

    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub const fn effective_steps(&self) -> u32 {
        self.effective_steps
    }

    #[must_use]
    pub const fn state(&self) -> SquadronState {
        self.state
    }

    pub const fn set_state(&mut self, state: SquadronState) {
        self.state = state;
    }

    /// Still has steps that have not been turned away.
    #[must_use]
    pub const fn is_effective(&self) -> bool {
        self.effective_steps > 0
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.steps == 0
    }

    /// Turn one step away from the attack. Returns true once nothing effective remains.
    pub const fn turn_away_step(&mut self) -> bool {
        self.effective_steps = self.effective_steps.saturating_sub(1);
        self.effective_steps == 0
    }

    /// Lose one step outright. Returns true when the squadron is destroyed.
    pub fn lose_step(&mut self) -> bool {
        self.steps = self.steps.saturating_sub(1);
        self.effective_steps = self.effective_steps.min(self.steps);
        self.steps == 0
    }

    /// Turned-away steps rejoin once the squadron is back on the ground.
    pub const fn restore_effectiveness(&mut self) {
        self.effective_steps = self.steps;
    }

    /// Attack dice contributed against a target class, scaled by effective strength.
    #[must_use]
    pub fn attack_factor(&self, class: TargetClass) -> u32 {
        let base = self.attack.rating(class).factor;
        if self.max_steps == 0 || base == 0 {
            return 0;
        }
        let scaled = u64::from(base) * u64::from(self.effective_steps);
        let max = u64::from(self.max_steps);
        let factor = scaled / max + u64::from(scaled % max > 0);
        u32::try_from(factor).unwrap_or(u32::MAX)
    }

    /// Chance for one attack die to hit, after the roll modifier.
    #[must_use]
    pub fn hit_chance(&self, class: TargetClass, modifier: i32) -> HitChance {
        HitChance::from_to_hit(self.attack.rating(class).to_hit, modifier)
    }
}
