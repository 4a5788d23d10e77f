//! Squadrons assigned to a mission, partitioned by role.
//!
//! The roster owns its squadrons for the life of the mission. Anti-aircraft
//! resolution first turns steps away from the main force, one uniform roll
//! per step, then destroys steps from squadrons already turned away.
use rand::RngCore;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::dice::roll;
use crate::squadron::{Squadron, SquadronState};

/// Role a squadron flies on its mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionRole {
    Main,
    Escort,
}

pub const ALL_ROLES: [MissionRole; 2] = [MissionRole::Main, MissionRole::Escort];

/// Role to squadron-name assignment as persisted and as ordered by a player.
pub type RoleAssignment = BTreeMap<MissionRole, Vec<String>>;

/// Errors raised while staffing a roster.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("squadron {name} is not available")]
    Unavailable { name: String },
    #[error("squadron {name} is listed more than once")]
    Duplicate { name: String },
}

/// Holder of squadrons that a roster can draw from and hand back to.
pub trait SquadronSource {
    fn take_squadron(&mut self, name: &str) -> Option<Squadron>;

    fn return_squadron(&mut self, squadron: Squadron);
}

/// Outcome of one anti-aircraft resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttritionReport {
    /// Squadrons newly turned away by this resolution.
    pub turned_away: Vec<String>,
    pub steps_turned_away: u32,
    pub steps_lost: u32,
    pub destroyed: Vec<String>,
}

/// Squadrons flying a mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRoster {
    squadrons: BTreeMap<MissionRole, Vec<Squadron>>,
    turned_away: SmallVec<[String; 4]>,
    destroyed: u32,
}

impl Default for MissionRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionRoster {
    /// Empty roster with an entry for every role.
    #[must_use]
    pub fn new() -> Self {
        let squadrons = ALL_ROLES.iter().map(|role| (*role, Vec::new())).collect();
        Self {
            squadrons,
            turned_away: SmallVec::new(),
            destroyed: 0,
        }
    }

    /// Draw the named squadrons from `source`, filling every role.
    ///
    /// On failure every squadron already drawn goes back to `source`.
    ///
    /// # Errors
    ///
    /// Returns `RosterError` when a name is unavailable or repeated.
    pub fn set_squadrons(
        &mut self,
        assignment: &RoleAssignment,
        source: &mut dyn SquadronSource,
    ) -> Result<(), RosterError> {
        let mut drawn: Vec<(MissionRole, Squadron)> = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        for role in ALL_ROLES {
            let names = assignment.get(&role).map(Vec::as_slice).unwrap_or_default();
            for name in names {
                let failure = if seen.contains(&name.as_str()) {
                    Some(RosterError::Duplicate { name: name.clone() })
                } else if let Some(squadron) = source.take_squadron(name) {
                    seen.push(name);
                    drawn.push((role, squadron));
                    None
                } else {
                    Some(RosterError::Unavailable { name: name.clone() })
                };
                if let Some(err) = failure {
                    for (_, squadron) in drawn {
                        source.return_squadron(squadron);
                    }
                    return Err(err);
                }
            }
        }
        for role in ALL_ROLES {
            self.squadrons.entry(role).or_default();
        }
        for (role, squadron) in drawn {
            self.add(role, squadron);
        }
        Ok(())
    }

    pub fn add(&mut self, role: MissionRole, mut squadron: Squadron) {
        squadron.set_state(SquadronState::Assigned);
        self.squadrons.entry(role).or_default().push(squadron);
    }

    /// Take a squadron off the mission, ready for its airbase.
    pub fn remove(&mut self, role: MissionRole, name: &str) -> Option<Squadron> {
        let list = self.squadrons.get_mut(&role)?;
        let index = list.iter().position(|squadron| squadron.name == name)?;
        let mut squadron = list.remove(index);
        self.turned_away.retain(|entry| *entry != name);
        squadron.restore_effectiveness();
        squadron.set_state(SquadronState::Ready);
        Some(squadron)
    }

    #[must_use]
    pub fn squadrons(&self, role: MissionRole) -> &[Squadron] {
        self.squadrons.get(&role).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MissionRole, &Squadron)> {
        self.squadrons
            .iter()
            .flat_map(|(role, list)| list.iter().map(move |squadron| (*role, squadron)))
    }

    /// Squadron names per role, every role present.
    #[must_use]
    pub fn assignment(&self) -> RoleAssignment {
        ALL_ROLES
            .iter()
            .map(|role| {
                let names = self
                    .squadrons(*role)
                    .iter()
                    .map(|squadron| squadron.name.clone())
                    .collect();
                (*role, names)
            })
            .collect()
    }

    #[must_use]
    pub fn has_role(&self, role: MissionRole) -> bool {
        self.squadrons.contains_key(&role)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.squadrons.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shortest range across the roster; zero when empty.
    #[must_use]
    pub fn minimum_range(&self) -> u32 {
        self.iter()
            .map(|(_, squadron)| squadron.range)
            .min()
            .unwrap_or(0)
    }

    /// Total strength in steps across all roles.
    #[must_use]
    pub fn steps(&self) -> u32 {
        self.iter().map(|(_, squadron)| squadron.steps()).sum()
    }

    #[must_use]
    pub fn turned_away(&self) -> &[String] {
        &self.turned_away
    }

    #[must_use]
    pub const fn destroyed_count(&self) -> u32 {
        self.destroyed
    }

    pub fn take_off(&mut self) {
        self.set_all(SquadronState::Airborne);
    }

    pub fn patrol(&mut self) {
        self.set_all(SquadronState::Patrolling);
    }

    /// Back on the ground; turned-away steps rejoin their squadrons.
    pub fn land(&mut self) {
        for list in self.squadrons.values_mut() {
            for squadron in list {
                squadron.restore_effectiveness();
                squadron.set_state(SquadronState::Ready);
            }
        }
        self.turned_away.clear();
    }

    fn set_all(&mut self, state: SquadronState) {
        for list in self.squadrons.values_mut() {
            for squadron in list {
                squadron.set_state(state);
            }
        }
    }

    /// Reapply saved squadron states by name.
    pub fn restore_states(&mut self, states: &BTreeMap<String, SquadronState>) {
        for list in self.squadrons.values_mut() {
            for squadron in list {
                if let Some(state) = states.get(&squadron.name) {
                    squadron.set_state(*state);
                }
            }
        }
    }

    /// Forget last turn's turned-away squadrons.
    pub fn begin_turn(&mut self) {
        self.turned_away.clear();
    }

    /// Remove every squadron, ready for their airbase; role entries remain.
    pub fn release(&mut self) -> Vec<Squadron> {
        self.land();
        self.squadrons
            .values_mut()
            .flat_map(std::mem::take)
            .collect()
    }

    /// Resolve defensive fire against the main force.
    ///
    /// Turns away `turned_away_steps` steps, then destroys half as many steps
    /// from squadrons already turned away. Stops early when nothing is left
    /// to pick from.
    pub fn resolve_anti_air<R: RngCore + ?Sized>(
        &mut self,
        turned_away_steps: u32,
        rng: &mut R,
    ) -> AttritionReport {
        let mut report = AttritionReport::default();
        let main = self.squadrons.entry(MissionRole::Main).or_default();

        for _ in 0..turned_away_steps {
            let effective: Vec<usize> = main
                .iter()
                .enumerate()
                .filter(|(_, squadron)| squadron.is_effective())
                .map(|(index, _)| index)
                .collect();
            let Some(pick) = pick_index(rng, effective.len()) else {
                break;
            };
            let squadron = &mut main[effective[pick]];
            squadron.turn_away_step();
            report.steps_turned_away += 1;
            if !self.turned_away.iter().any(|name| *name == squadron.name) {
                self.turned_away.push(squadron.name.clone());
                report.turned_away.push(squadron.name.clone());
            }
        }

        for _ in 0..turned_away_steps / 2 {
            let Some(pick) = pick_index(rng, self.turned_away.len()) else {
                break;
            };
            let Some(index) = main
                .iter()
                .position(|squadron| squadron.name == self.turned_away[pick])
            else {
                self.turned_away.remove(pick);
                continue;
            };
            report.steps_lost += 1;
            if main[index].lose_step() {
                let lost = main.remove(index);
                self.turned_away.remove(pick);
                self.destroyed += 1;
                log::debug!("squadron {} destroyed by anti-aircraft fire", lost.name);
                report.destroyed.push(lost.name);
            }
        }

        report
    }
}

fn pick_index<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let sides = u32::try_from(len).unwrap_or(u32::MAX);
    usize::try_from(roll(rng, sides) - 1).ok()
}
