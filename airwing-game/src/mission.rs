//! Mission lifecycle: launch, flight out, action at the target, and return.
//!
//! Turn counters are measured from the launch turn. A mission reaches its
//! target once `elapsed + 1 >= turns_to_target`, crediting the turn in
//! progress, and lands on the same rule against `turns_to_home`.
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::grid::{GridCell, GridRef, GridService};
use crate::numbers::ceil_div;
use crate::path::{FlightPath, FlightPathKind, FlightPathRecord, PathError, plan_out_bound};
use crate::probability::{ProbabilityStats, strike_probability};
use crate::record::MissionRecord;
use crate::roster::{AttritionReport, MissionRole, MissionRoster, RosterError, SquadronSource};
use crate::squadron::{Squadron, SquadronState, TargetClass};
use crate::target::{AntiAirModel, Nation, TargetDirectory, TargetRef, TargetSlot};
use crate::variant::{MissionVariant, TargetAction};
use crate::weather::Weather;

/// Theater-wide mission identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(pub u32);

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{:04}", self.0)
    }
}

/// Lifecycle state of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    /// Squadrons assigned, still on the ground.
    #[default]
    Ready,
    OutBound,
    AtTarget,
    Returning,
    Landed,
}

impl MissionState {
    #[must_use]
    pub const fn is_airborne(self) -> bool {
        matches!(self, Self::OutBound | Self::AtTarget | Self::Returning)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::OutBound => "out_bound",
            Self::AtTarget => "at_target",
            Self::Returning => "returning",
            Self::Landed => "landed",
        }
    }
}

/// Errors local to a single mission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MissionError {
    #[error("mission {id} cannot {action} while {state}", state = state.label())]
    InvalidTransition {
        id: MissionId,
        state: MissionState,
        action: &'static str,
    },
    #[error("mission {id} target {target} is not among the visible targets")]
    TargetNotFound { id: MissionId, target: String },
    #[error("mission {id} has no squadron with range to fly")]
    NoRange { id: MissionId },
    #[error("mission {id} flight path: {source}")]
    Path {
        id: MissionId,
        #[source]
        source: PathError,
    },
    #[error("mission {id} roster: {source}")]
    Roster {
        id: MissionId,
        #[source]
        source: RosterError,
    },
}

/// Per-turn inputs shared by every mission advanced in a turn.
pub struct TurnContext<'a> {
    pub turn: u32,
    pub weather: Weather,
    pub grid: &'a dyn GridService,
    pub targets: &'a dyn TargetDirectory,
    pub anti_air: &'a dyn AntiAirModel,
    pub config: &'a EngineConfig,
    pub rng: &'a mut dyn RngCore,
}

/// Result of the action taken over the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Attrition(AttritionReport),
    Patrolled { squadrons: usize },
    Ferried { destination: String, squadrons: usize },
    Observed { target: String },
}

/// What a single advance did to a mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionEvent {
    Launched { turns_to_target: u32 },
    EnRoute { cell: GridCell },
    ArrivedAtTarget { cell: GridCell },
    Executed(TargetOutcome),
    Homebound { cell: GridCell },
    Landed,
    Idle,
}

/// A single flight order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    id: MissionId,
    variant: MissionVariant,
    origin: String,
    origin_location: GridRef,
    nation: Nation,
    target: TargetSlot,
    /// Target position captured at launch; flight paths are rebuilt from it.
    target_location: Option<GridRef>,
    state: MissionState,
    roster: MissionRoster,
    start_turn: Option<u32>,
    turns_to_target: Option<u32>,
    turns_to_home: Option<u32>,
    range: u32,
    path: Option<FlightPath>,
    saved_path: Option<FlightPathRecord>,
}

impl Mission {
    /// New mission on the ground; the target is looked up by name at launch.
    #[must_use]
    pub fn new(
        id: MissionId,
        variant: MissionVariant,
        origin: &str,
        origin_location: GridRef,
        nation: Nation,
        target: &str,
        roster: MissionRoster,
    ) -> Self {
        Self {
            id,
            variant,
            origin: origin.to_string(),
            origin_location,
            nation,
            target: TargetSlot::named(target),
            target_location: None,
            state: MissionState::Ready,
            roster,
            start_turn: None,
            turns_to_target: None,
            turns_to_home: None,
            range: 0,
            path: None,
            saved_path: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> MissionId {
        self.id
    }

    #[must_use]
    pub const fn variant(&self) -> MissionVariant {
        self.variant
    }

    #[must_use]
    pub const fn state(&self) -> MissionState {
        self.state
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub const fn nation(&self) -> &Nation {
        &self.nation
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target.name()
    }

    #[must_use]
    pub const fn target(&self) -> &TargetSlot {
        &self.target
    }

    #[must_use]
    pub const fn roster(&self) -> &MissionRoster {
        &self.roster
    }

    pub const fn roster_mut(&mut self) -> &mut MissionRoster {
        &mut self.roster
    }

    #[must_use]
    pub const fn start_turn(&self) -> Option<u32> {
        self.start_turn
    }

    #[must_use]
    pub const fn turns_to_target(&self) -> Option<u32> {
        self.turns_to_target
    }

    #[must_use]
    pub const fn turns_to_home(&self) -> Option<u32> {
        self.turns_to_home
    }

    /// Grid steps flown per turn, fixed at launch.
    #[must_use]
    pub const fn range(&self) -> u32 {
        self.range
    }

    #[must_use]
    pub const fn path(&self) -> Option<&FlightPath> {
        self.path.as_ref()
    }

    /// Turns left before landing, counting the turn in progress.
    #[must_use]
    pub fn turns_remaining_home(&self, turn: u32) -> Option<u32> {
        let home = self.turns_to_home?;
        Some(home.saturating_sub(self.elapsed(turn)))
    }

    /// Whether weather changes this mission's odds.
    #[must_use]
    pub const fn is_weather_sensitive(&self) -> bool {
        self.variant.is_weather_sensitive()
    }

    fn elapsed(&self, turn: u32) -> u32 {
        self.start_turn
            .map_or(0, |start| turn.saturating_sub(start))
    }

    const fn invalid(&self, action: &'static str) -> MissionError {
        MissionError::InvalidTransition {
            id: self.id,
            state: self.state,
            action,
        }
    }

    /// Resolve the target once; later calls reuse the result.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::TargetNotFound` if the target is not visible.
    pub fn resolve_target(
        &mut self,
        targets: &dyn TargetDirectory,
    ) -> Result<&TargetRef, MissionError> {
        let id = self.id;
        let variant = self.variant;
        let Self { target, nation, .. } = self;
        let name = target.name().to_string();
        target
            .resolve(targets, variant, nation)
            .ok_or(MissionError::TargetNotFound { id, target: name })
    }

    /// Compute the flight path if it is not already known.
    ///
    /// # Errors
    ///
    /// Returns `MissionError` when the target or either endpoint cannot be resolved.
    pub fn ensure_path(
        &mut self,
        grid: &dyn GridService,
        targets: &dyn TargetDirectory,
    ) -> Result<&FlightPath, MissionError> {
        if self.path.is_none() {
            let id = self.id;
            let location = match &self.target_location {
                Some(location) => location.clone(),
                None => self.resolve_target(targets)?.location.clone(),
            };
            let out_bound = plan_out_bound(grid, &self.origin_location, &location)
                .map_err(|source| MissionError::Path { id, source })?;
            let path = match self.saved_path.take() {
                Some(record) => FlightPath::from_record(record, out_bound),
                None => FlightPath::new(self.fresh_path_kind(), out_bound),
            }
            .map_err(|source| MissionError::Path { id, source })?;
            self.target_location = Some(location);
            self.path = Some(path);
        }
        let id = self.id;
        self.path.as_ref().ok_or(MissionError::Path {
            id,
            source: PathError::Empty,
        })
    }

    const fn fresh_path_kind(&self) -> FlightPathKind {
        if self.variant.is_round_trip() {
            FlightPathKind::RoundTrip
        } else {
            FlightPathKind::OneWay
        }
    }

    fn path_mut(&mut self) -> Result<&mut FlightPath, MissionError> {
        let id = self.id;
        self.path.as_mut().ok_or(MissionError::Path {
            id,
            source: PathError::Empty,
        })
    }

    /// Take off: fix the range and the turns needed to reach the target and home.
    ///
    /// # Errors
    ///
    /// Returns `MissionError` if the mission is not ready, the target or path
    /// cannot be resolved, or no squadron can fly.
    pub fn launch(
        &mut self,
        turn: u32,
        grid: &dyn GridService,
        targets: &dyn TargetDirectory,
    ) -> Result<u32, MissionError> {
        if self.state != MissionState::Ready {
            return Err(self.invalid("launch"));
        }
        let range = self.roster.minimum_range();
        if range == 0 {
            return Err(MissionError::NoRange { id: self.id });
        }
        let path = self.ensure_path(grid, targets)?;
        let to_target = ceil_div(path.out_bound_distance(), range);
        let to_home = ceil_div(path.total_distance(), range);

        self.range = range;
        self.start_turn = Some(turn);
        self.turns_to_target = Some(to_target);
        self.turns_to_home = Some(to_home);
        self.roster.take_off();
        self.state = MissionState::OutBound;
        log::debug!(
            "{} {} launched from {} on turn {turn}: {to_target} turns to {}",
            self.id,
            self.variant,
            self.origin,
            self.target.name()
        );
        Ok(to_target)
    }

    /// Fly one turn toward the target.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::InvalidTransition` unless out-bound.
    pub fn fly(&mut self, turn: u32) -> Result<MissionState, MissionError> {
        if self.state != MissionState::OutBound {
            return Err(self.invalid("fly"));
        }
        let range = self.range;
        self.path_mut()?.advance_out_bound(range);
        let to_target = self.turns_to_target.unwrap_or(0);
        if self.elapsed(turn) + 1 >= to_target {
            self.state = MissionState::AtTarget;
        }
        Ok(self.state)
    }

    /// Act on the target and turn for home.
    ///
    /// # Errors
    ///
    /// Returns `MissionError` unless at the target with a resolved target.
    pub fn execute(&mut self, ctx: &mut TurnContext<'_>) -> Result<TargetOutcome, MissionError> {
        if self.state != MissionState::AtTarget {
            return Err(self.invalid("execute"));
        }
        let target = self.resolve_target(ctx.targets)?.clone();
        let outcome = match self.variant.target_action() {
            TargetAction::RunDefences => {
                let steps = ctx.anti_air.turned_away_steps(&target, ctx.weather);
                let report = self.roster.resolve_anti_air(steps, &mut *ctx.rng);
                log::debug!(
                    "{} over {}: {} steps turned away, {} lost",
                    self.id,
                    target.name,
                    report.steps_turned_away,
                    report.steps_lost
                );
                TargetOutcome::Attrition(report)
            }
            TargetAction::Patrol => {
                self.roster.patrol();
                TargetOutcome::Patrolled {
                    squadrons: self.roster.len(),
                }
            }
            TargetAction::Transfer => TargetOutcome::Ferried {
                destination: target.name.clone(),
                squadrons: self.roster.len(),
            },
            TargetAction::Observe => TargetOutcome::Observed {
                target: target.name.clone(),
            },
        };
        match outcome {
            TargetOutcome::Ferried { .. } => {
                // One-way flights end at the destination; the roster is handed over on release.
                self.path_mut()?.finish();
                self.roster.land();
                self.state = MissionState::Landed;
            }
            // Patrolling squadrons stay on station until the flight home starts.
            TargetOutcome::Patrolled { .. } => self.state = MissionState::Returning,
            _ => {
                self.roster.take_off();
                self.state = MissionState::Returning;
            }
        }
        Ok(outcome)
    }

    /// Turn back from the current position; returns the new turns-to-home.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::InvalidTransition` unless out-bound or at the target.
    pub fn recall(&mut self, turn: u32) -> Result<u32, MissionError> {
        if !matches!(self.state, MissionState::OutBound | MissionState::AtTarget) {
            return Err(self.invalid("recall"));
        }
        let range = self.range;
        let remaining = match (self.path.as_mut(), self.saved_path.as_mut()) {
            (Some(path), _) => path.recall(),
            (None, Some(saved)) => saved.recall(),
            (None, None) => {
                return Err(MissionError::Path {
                    id: self.id,
                    source: PathError::Empty,
                });
            }
        };
        let to_home = self.elapsed(turn) + ceil_div(remaining, range);
        self.turns_to_home = Some(to_home);
        self.turns_to_target = None;
        self.roster.take_off();
        self.state = MissionState::Returning;
        log::debug!(
            "{} recalled on turn {turn}, {remaining} steps from home",
            self.id
        );
        Ok(to_home)
    }

    /// Fly one turn toward home, landing once the turn count is reached.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::InvalidTransition` unless returning.
    pub fn fly_home(&mut self, turn: u32) -> Result<MissionState, MissionError> {
        if self.state != MissionState::Returning {
            return Err(self.invalid("fly home"));
        }
        let range = self.range;
        self.path_mut()?.advance(range);
        self.roster.take_off();
        let to_home = self.turns_to_home.unwrap_or(0);
        if self.elapsed(turn) + 1 >= to_home {
            self.land()?;
        }
        Ok(self.state)
    }

    /// Touch down; the roster is ready to go back to its airbase.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::InvalidTransition` unless returning.
    pub fn land(&mut self) -> Result<(), MissionError> {
        if self.state != MissionState::Returning {
            return Err(self.invalid("land"));
        }
        if let Some(path) = self.path.as_mut() {
            path.finish();
        }
        self.roster.land();
        self.state = MissionState::Landed;
        log::debug!("{} landed at {}", self.id, self.origin);
        Ok(())
    }

    /// Run the one transition due this turn.
    ///
    /// # Errors
    ///
    /// Returns `MissionError` from whichever transition was attempted.
    pub fn advance(&mut self, ctx: &mut TurnContext<'_>) -> Result<MissionEvent, MissionError> {
        self.roster.begin_turn();
        if self.state.is_airborne() {
            self.ensure_path(ctx.grid, ctx.targets)?;
        }
        match self.state {
            MissionState::Ready => {
                let turns_to_target = self.launch(ctx.turn, ctx.grid, ctx.targets)?;
                self.fly(ctx.turn)?;
                Ok(MissionEvent::Launched { turns_to_target })
            }
            MissionState::OutBound => {
                let state = self.fly(ctx.turn)?;
                let cell = self.position()?;
                Ok(if state == MissionState::AtTarget {
                    MissionEvent::ArrivedAtTarget { cell }
                } else {
                    MissionEvent::EnRoute { cell }
                })
            }
            MissionState::AtTarget => match self.execute(ctx) {
                Err(err @ MissionError::TargetNotFound { .. }) => {
                    // Nothing left to act on; head home instead of circling.
                    self.recall(ctx.turn)?;
                    Err(err)
                }
                other => other.map(MissionEvent::Executed),
            },
            MissionState::Returning => {
                let state = self.fly_home(ctx.turn)?;
                Ok(if state == MissionState::Landed {
                    MissionEvent::Landed
                } else {
                    MissionEvent::Homebound {
                        cell: self.position()?,
                    }
                })
            }
            MissionState::Landed => Ok(MissionEvent::Idle),
        }
    }

    fn position(&self) -> Result<GridCell, MissionError> {
        self.path
            .as_ref()
            .map(FlightPath::current_cell)
            .ok_or(MissionError::Path {
                id: self.id,
                source: PathError::Empty,
            })
    }

    /// Hand every squadron back, e.g. after landing or on cancellation.
    pub fn release_squadrons(&mut self) -> Vec<Squadron> {
        self.roster.release()
    }

    /// Roll modifier for this mission's strike against `target`.
    #[must_use]
    pub fn strike_modifier(&self, target: &TargetRef, config: &EngineConfig, weather: Weather) -> i32 {
        let mut modifier = config.base_modifier;
        if self.variant.is_weather_sensitive() {
            modifier += config.weather.modifier(weather);
        }
        if self.variant == MissionVariant::PortStrike
            && target.in_port
            && matches!(target.class, TargetClass::Port)
        {
            modifier += config.in_port_bonus;
        }
        modifier
    }

    /// Hit estimate for strike variants; `None` for everything else.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::TargetNotFound` if the target is not visible.
    pub fn strike_probability(
        &mut self,
        targets: &dyn TargetDirectory,
        config: &EngineConfig,
        weather: Weather,
    ) -> Result<Option<ProbabilityStats>, MissionError> {
        if !self.variant.is_strike() {
            return Ok(None);
        }
        let target = self.resolve_target(targets)?.clone();
        let modifier = self.strike_modifier(&target, config, weather);
        Ok(Some(strike_probability(
            self.roster.squadrons(MissionRole::Main),
            &target,
            modifier,
            config.max_hits,
        )))
    }

    /// Persistable view; object references are stored by name.
    #[must_use]
    pub fn to_record(&self) -> MissionRecord {
        MissionRecord {
            id: self.id,
            variant: self.variant,
            state: self.state,
            nation: self.nation.clone(),
            origin: self.origin.clone(),
            target: self.target.name().to_string(),
            target_location: self.target_location.clone(),
            roster: self.roster.assignment(),
            path: self
                .path
                .as_ref()
                .map(FlightPath::record)
                .or(self.saved_path),
            start_turn: self.start_turn,
            turns_to_target: self.turns_to_target,
            turns_to_home: self.turns_to_home,
            range: self.range,
        }
    }

    /// Rebuild a mission, drawing its squadrons back out of `source` by name.
    ///
    /// The target is re-resolved on first use. The flight path is rebuilt
    /// from the saved target location, so it survives the target leaving
    /// the directory.
    ///
    /// # Errors
    ///
    /// Returns `MissionError::Roster` when a named squadron is unavailable.
    pub fn from_record(
        record: &MissionRecord,
        origin_location: GridRef,
        source: &mut dyn SquadronSource,
    ) -> Result<Self, MissionError> {
        let mut roster = MissionRoster::new();
        roster
            .set_squadrons(&record.roster, source)
            .map_err(|source| MissionError::Roster {
                id: record.id,
                source,
            })?;
        if record.state.is_airborne() {
            roster.take_off();
        }
        let mut mission = Self::new(
            record.id,
            record.variant,
            &record.origin,
            origin_location,
            record.nation.clone(),
            &record.target,
            roster,
        );
        mission.state = record.state;
        mission.target_location.clone_from(&record.target_location);
        mission.saved_path = record.path;
        mission.start_turn = record.start_turn;
        mission.turns_to_target = record.turns_to_target;
        mission.turns_to_home = record.turns_to_home;
        mission.range = record.range;
        Ok(mission)
    }

    /// Reapply squadron states saved with the airbase, e.g. a patrol on station.
    pub fn restore_squadron_states(&mut self, states: &BTreeMap<String, SquadronState>) {
        self.roster.restore_states(states);
    }
}
