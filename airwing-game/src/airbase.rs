//! Airbases own squadrons on the ground and the missions flown from them.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::grid::{GridRef, GridService};
use crate::mission::{
    Mission, MissionError, MissionEvent, MissionId, MissionState, TargetOutcome, TurnContext,
};
use crate::path::PathError;
use crate::probability::ProbabilityStats;
use crate::record::AirbaseRecord;
use crate::roster::{AttritionReport, MissionRoster, RoleAssignment, RosterError, SquadronSource};
use crate::squadron::{Squadron, SquadronState};
use crate::target::{Nation, TargetDirectory};
use crate::variant::MissionVariant;
use crate::weather::Weather;

/// A request to fly a mission from an airbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionOrder {
    pub variant: MissionVariant,
    pub target: String,
    pub squadrons: RoleAssignment,
}

/// Reasons an order or mission command is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("order names no squadrons")]
    NoSquadrons,
    #[error("target {target} is not visible for a {variant} mission")]
    TargetNotFound {
        target: String,
        variant: MissionVariant,
    },
    #[error("target {target} is {distance} steps away, beyond the reach of {reach}")]
    OutOfRange {
        target: String,
        distance: u32,
        reach: u32,
    },
    #[error("{target} has room for {free} squadrons, {needed} ordered")]
    NoCapacity {
        target: String,
        free: u32,
        needed: u32,
    },
    #[error("mission {id} is not flown from this airbase")]
    UnknownMission { id: MissionId },
    #[error("mission {id} has already launched")]
    AlreadyLaunched { id: MissionId },
    #[error("unknown airbase {name}")]
    UnknownAirbase { name: String },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Mission(#[from] MissionError),
}

/// Squadrons delivered by a ferry flight, waiting to join their destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub mission: MissionId,
    pub origin: String,
    pub destination: String,
    pub squadrons: Vec<Squadron>,
}

/// One airbase's share of a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AirbaseReport {
    pub events: Vec<(MissionId, MissionEvent)>,
    pub failures: Vec<(MissionId, MissionError)>,
    pub aborted: Vec<MissionId>,
    pub transfers: Vec<Transfer>,
}

impl AirbaseReport {
    /// Attrition from every strike and sweep this turn.
    pub fn attrition(&self) -> impl Iterator<Item = (MissionId, &AttritionReport)> {
        self.events.iter().filter_map(|(id, event)| match event {
            MissionEvent::Executed(TargetOutcome::Attrition(report)) => Some((*id, report)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Airbase {
    pub name: String,
    pub location: GridRef,
    pub nation: Nation,
    pub region: Option<String>,
    /// Squadrons the airbase can hold, counting those away on missions.
    pub capacity: u32,
    pub anti_air: u32,
    squadrons: Vec<Squadron>,
    missions: BTreeMap<MissionId, Mission>,
}

impl Airbase {
    #[must_use]
    pub fn new(name: &str, location: &str, nation: &Nation, capacity: u32) -> Self {
        Self {
            name: name.to_string(),
            location: GridRef::new(location),
            nation: nation.clone(),
            region: None,
            capacity,
            anti_air: 0,
            squadrons: Vec::new(),
            missions: BTreeMap::new(),
        }
    }

    /// Squadrons on the ground.
    #[must_use]
    pub fn squadrons(&self) -> &[Squadron] {
        &self.squadrons
    }

    #[must_use]
    pub fn squadron(&self, name: &str) -> Option<&Squadron> {
        self.squadrons.iter().find(|squadron| squadron.name == name)
    }

    pub fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values()
    }

    #[must_use]
    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    pub fn mission_mut(&mut self, id: MissionId) -> Option<&mut Mission> {
        self.missions.get_mut(&id)
    }

    /// Squadrons owned, whether on the ground or flying.
    #[must_use]
    pub fn squadron_count(&self) -> usize {
        self.squadrons.len()
            + self
                .missions
                .values()
                .map(|mission| mission.roster().len())
                .sum::<usize>()
    }

    #[must_use]
    pub fn free_capacity(&self) -> u32 {
        let used = u32::try_from(self.squadron_count()).unwrap_or(u32::MAX);
        self.capacity.saturating_sub(used)
    }

    /// Station squadrons here, e.g. reinforcements or ferry arrivals.
    pub fn accept_squadrons(&mut self, squadrons: impl IntoIterator<Item = Squadron>) {
        for mut squadron in squadrons {
            squadron.home.clone_from(&self.name);
            squadron.set_state(SquadronState::Ready);
            squadron.restore_effectiveness();
            self.squadrons.push(squadron);
        }
    }

    /// Validate an order and create a mission for it under `id`.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` when a squadron is not on the ground, the
    /// target is not visible, the target lies beyond the force's reach, or a
    /// ferry destination lacks room. No squadron leaves the pool on error.
    pub fn assign_mission(
        &mut self,
        id: MissionId,
        order: &MissionOrder,
        grid: &dyn GridService,
        targets: &dyn TargetDirectory,
        config: &EngineConfig,
    ) -> Result<MissionId, AssignmentError> {
        let needed: usize = order.squadrons.values().map(Vec::len).sum();
        if needed == 0 {
            return Err(AssignmentError::NoSquadrons);
        }
        let target = targets
            .find(&order.target, order.variant, &self.nation)
            .ok_or_else(|| AssignmentError::TargetNotFound {
                target: order.target.clone(),
                variant: order.variant,
            })?;
        if order.variant == MissionVariant::Ferry {
            let needed = u32::try_from(needed).unwrap_or(u32::MAX);
            if target.capacity < needed {
                return Err(AssignmentError::NoCapacity {
                    target: target.name,
                    free: target.capacity,
                    needed,
                });
            }
        }
        let origin = grid
            .cell_of(&self.location)
            .ok_or_else(|| PathError::UnresolvedCell {
                reference: self.location.clone(),
            })?;
        let destination = grid
            .cell_of(&target.location)
            .ok_or_else(|| PathError::UnresolvedCell {
                reference: target.location.clone(),
            })?;

        let mut roster = MissionRoster::new();
        roster.set_squadrons(&order.squadrons, self)?;
        let distance = grid.distance(origin, destination);
        let reach = roster
            .minimum_range()
            .saturating_mul(config.max_mission_turns);
        if distance > reach {
            for squadron in roster.release() {
                self.return_squadron(squadron);
            }
            return Err(AssignmentError::OutOfRange {
                target: target.name,
                distance,
                reach,
            });
        }

        let mission = Mission::new(
            id,
            order.variant,
            &self.name,
            self.location.clone(),
            self.nation.clone(),
            &order.target,
            roster,
        );
        log::debug!(
            "{} assigned at {}: {} against {}",
            id,
            self.name,
            order.variant,
            order.target
        );
        self.missions.insert(id, mission);
        Ok(id)
    }

    /// Scrub a mission that has not launched; its squadrons return to the pool.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown or already launched missions.
    pub fn cancel_mission(&mut self, id: MissionId) -> Result<(), AssignmentError> {
        let state = self
            .missions
            .get(&id)
            .map(Mission::state)
            .ok_or(AssignmentError::UnknownMission { id })?;
        if state != MissionState::Ready {
            return Err(AssignmentError::AlreadyLaunched { id });
        }
        if let Some(mission) = self.missions.remove(&id) {
            self.stand_down(mission);
        }
        Ok(())
    }

    /// Cancel every mission still on the ground; returns how many were cancelled.
    pub fn clear_missions(&mut self) -> usize {
        let ready: Vec<MissionId> = self
            .missions
            .values()
            .filter(|mission| mission.state() == MissionState::Ready)
            .map(Mission::id)
            .collect();
        for id in &ready {
            if let Some(mission) = self.missions.remove(id) {
                self.stand_down(mission);
            }
        }
        ready.len()
    }

    /// Order an airborne mission home.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown missions or ones that cannot turn back.
    pub fn recall_mission(&mut self, id: MissionId, turn: u32) -> Result<u32, AssignmentError> {
        let mission = self
            .missions
            .get_mut(&id)
            .ok_or(AssignmentError::UnknownMission { id })?;
        Ok(mission.recall(turn)?)
    }

    /// Hit estimate for one of this airbase's strike missions.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown missions or unresolved targets.
    pub fn strike_probability(
        &mut self,
        id: MissionId,
        targets: &dyn TargetDirectory,
        config: &EngineConfig,
        weather: Weather,
    ) -> Result<Option<ProbabilityStats>, AssignmentError> {
        let mission = self
            .missions
            .get_mut(&id)
            .ok_or(AssignmentError::UnknownMission { id })?;
        Ok(mission.strike_probability(targets, config, weather)?)
    }

    /// Advance every mission one turn.
    ///
    /// A failure only affects its own mission. Missions that fail to launch
    /// are aborted and their squadrons rejoin the pool.
    pub fn advance_missions(&mut self, ctx: &mut TurnContext<'_>) -> AirbaseReport {
        let mut report = AirbaseReport::default();
        let ids: Vec<MissionId> = self.missions.keys().copied().collect();
        for id in ids {
            let Some(mission) = self.missions.get_mut(&id) else {
                continue;
            };
            match mission.advance(ctx) {
                Ok(MissionEvent::Idle) => {}
                Ok(event) => report.events.push((id, event)),
                Err(err) => {
                    log::warn!("{} at {} skipped: {err}", id, self.name);
                    if mission.state() == MissionState::Ready {
                        report.aborted.push(id);
                    }
                    report.failures.push((id, err));
                }
            }
        }

        for id in &report.aborted {
            if let Some(mission) = self.missions.remove(id) {
                self.stand_down(mission);
            }
        }

        let landed: Vec<MissionId> = self
            .missions
            .values()
            .filter(|mission| mission.state() == MissionState::Landed)
            .map(Mission::id)
            .collect();
        for id in landed {
            let Some(mut mission) = self.missions.remove(&id) else {
                continue;
            };
            let squadrons = mission.release_squadrons();
            if mission.variant() == MissionVariant::Ferry {
                report.transfers.push(Transfer {
                    mission: id,
                    origin: self.name.clone(),
                    destination: mission.target_name().to_string(),
                    squadrons,
                });
            } else {
                self.accept_squadrons(squadrons);
            }
        }
        report
    }

    fn stand_down(&mut self, mut mission: Mission) {
        for squadron in mission.release_squadrons() {
            self.return_squadron(squadron);
        }
    }

    /// Persist the pool and every mission; squadrons are stored once each.
    #[must_use]
    pub fn save(&self) -> AirbaseRecord {
        let mut squadrons = self.squadrons.clone();
        for mission in self.missions.values() {
            squadrons.extend(mission.roster().iter().map(|(_, squadron)| squadron.clone()));
        }
        AirbaseRecord {
            name: self.name.clone(),
            squadrons,
            missions: self.missions.values().map(Mission::to_record).collect(),
        }
    }

    /// Replace the pool and missions with a saved record.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` if the record names another airbase or a
    /// mission names a squadron the record does not hold. The airbase is
    /// left unchanged on error.
    pub fn restore(&mut self, record: &AirbaseRecord) -> Result<(), AssignmentError> {
        if record.name != self.name {
            return Err(AssignmentError::UnknownAirbase {
                name: record.name.clone(),
            });
        }
        let mut staging = Self {
            squadrons: Vec::new(),
            missions: BTreeMap::new(),
            ..self.clone()
        };
        let states: BTreeMap<String, SquadronState> = record
            .squadrons
            .iter()
            .map(|squadron| (squadron.name.clone(), squadron.state()))
            .collect();
        for mut squadron in record.squadrons.iter().cloned() {
            squadron.set_state(SquadronState::Ready);
            staging.squadrons.push(squadron);
        }
        for saved in &record.missions {
            let mut mission = Mission::from_record(saved, self.location.clone(), &mut staging)?;
            if saved.state.is_airborne() {
                mission.restore_squadron_states(&states);
            }
            staging.missions.insert(mission.id(), mission);
        }
        *self = staging;
        Ok(())
    }
}

impl SquadronSource for Airbase {
    fn take_squadron(&mut self, name: &str) -> Option<Squadron> {
        let index = self
            .squadrons
            .iter()
            .position(|squadron| squadron.name == name && !squadron.state().is_on_mission())?;
        Some(self.squadrons.remove(index))
    }

    fn return_squadron(&mut self, mut squadron: Squadron) {
        squadron.set_state(SquadronState::Ready);
        squadron.restore_effectiveness();
        self.squadrons.push(squadron);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::OffsetGrid;
    use crate::roster::MissionRole;
    use crate::squadron::{AttackProfile, AttackRating, TargetClass};
    use crate::target::{TargetRatingAntiAir, TargetRef, VisibleTargets};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn allies() -> Nation {
        Nation::new("Allies")
    }

    fn manston() -> Airbase {
        let mut base = Airbase::new("Manston", "0202", &allies(), 6);
        base.accept_squadrons([
            Squadron::new("22 Sqn", "", "Beaufort", 3, 2).with_attack(AttackProfile {
                land: AttackRating::new(1, 5),
                naval: AttackRating::new(2, 4),
            }),
            Squadron::new("74 Sqn", "", "Spitfire", 4, 2),
            Squadron::new("235 Sqn", "", "Blenheim", 1, 2),
        ]);
        base
    }

    fn targets() -> VisibleTargets {
        let mut targets = VisibleTargets::new();
        let mut brest = TargetRef::new("Brest", TargetClass::Port, "0207");
        brest.anti_air = 2;
        targets.reveal(&allies(), brest);
        let mut hawkinge = TargetRef::new("Hawkinge", TargetClass::Airfield, "0204");
        hawkinge.capacity = 1;
        targets.reveal(&allies(), hawkinge);
        targets.reveal(
            &allies(),
            TargetRef::new("Force H", TargetClass::TaskForce, "0205"),
        );
        targets
    }

    fn order(variant: MissionVariant, target: &str, main: &[&str], escort: &[&str]) -> MissionOrder {
        MissionOrder {
            variant,
            target: target.to_string(),
            squadrons: RoleAssignment::from([
                (
                    MissionRole::Main,
                    main.iter().map(ToString::to_string).collect(),
                ),
                (
                    MissionRole::Escort,
                    escort.iter().map(ToString::to_string).collect(),
                ),
            ]),
        }
    }

    fn grid() -> OffsetGrid {
        OffsetGrid::new(20, 20, 24.0)
    }

    #[test]
    fn assignment_moves_squadrons_out_of_the_pool() {
        let mut base = manston();
        let id = base
            .assign_mission(
                MissionId(1),
                &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &["74 Sqn"]),
                &grid(),
                &targets(),
                &EngineConfig::default(),
            )
            .unwrap();
        assert_eq!(base.squadrons().len(), 1);
        assert_eq!(base.squadron_count(), 3);
        assert_eq!(base.free_capacity(), 3);
        let mission = base.mission(id).unwrap();
        assert_eq!(mission.roster().len(), 2);
        assert_eq!(mission.state(), MissionState::Ready);
    }

    #[test]
    fn assignment_rejects_bad_orders_without_side_effects() {
        let mut base = manston();
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();

        let err = base
            .assign_mission(
                MissionId(1),
                &order(MissionVariant::PortStrike, "Kiel", &["22 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, AssignmentError::TargetNotFound { .. }));

        let err = base
            .assign_mission(
                MissionId(2),
                &order(MissionVariant::PortStrike, "Brest", &["22 Sqn", "235 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap_err();
        assert_eq!(
            err,
            AssignmentError::OutOfRange {
                target: "Brest".to_string(),
                distance: 5,
                reach: 3
            }
        );

        let err = base
            .assign_mission(
                MissionId(3),
                &order(MissionVariant::PortStrike, "Brest", &["22 Sqn", "99 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, AssignmentError::Roster(_)));

        let err = base
            .assign_mission(
                MissionId(4),
                &order(MissionVariant::Ferry, "Hawkinge", &["22 Sqn", "74 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap_err();
        assert!(matches!(err, AssignmentError::NoCapacity { needed: 2, .. }));

        assert_eq!(
            base.assign_mission(
                MissionId(5),
                &order(MissionVariant::PortStrike, "Brest", &[], &[]),
                &grid,
                &targets,
                &config,
            ),
            Err(AssignmentError::NoSquadrons)
        );

        assert_eq!(base.squadrons().len(), 3);
        assert!(base.missions().next().is_none());
        assert!(
            base.squadrons()
                .iter()
                .all(|s| s.state() == SquadronState::Ready)
        );
    }

    #[test]
    fn cancel_only_before_launch() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut base = manston();
        let first = base
            .assign_mission(
                MissionId(1),
                &order(MissionVariant::PortRecon, "Brest", &["74 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap();
        let mut ctx = TurnContext {
            turn: 1,
            weather: Weather::Clear,
            grid: &grid,
            targets: &targets,
            anti_air: &TargetRatingAntiAir,
            config: &config,
            rng: &mut rng,
        };
        base.advance_missions(&mut ctx);
        assert_eq!(
            base.cancel_mission(first),
            Err(AssignmentError::AlreadyLaunched { id: first })
        );

        let second = base
            .assign_mission(
                MissionId(2),
                &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &[]),
                &grid,
                &targets,
                &config,
            )
            .unwrap();
        base.cancel_mission(second).unwrap();
        assert!(base.squadron("22 Sqn").is_some());
        assert_eq!(
            base.cancel_mission(MissionId(9)),
            Err(AssignmentError::UnknownMission { id: MissionId(9) })
        );
    }

    #[test]
    fn clear_missions_leaves_airborne_flights() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::PortRecon, "Brest", &["74 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();
        let mut ctx = TurnContext {
            turn: 1,
            weather: Weather::Clear,
            grid: &grid,
            targets: &targets,
            anti_air: &TargetRatingAntiAir,
            config: &config,
            rng: &mut rng,
        };
        base.advance_missions(&mut ctx);
        base.assign_mission(
            MissionId(2),
            &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();
        assert_eq!(base.clear_missions(), 1);
        assert_eq!(base.missions().count(), 1);
        assert_eq!(base.squadrons().len(), 2);
    }

    #[test]
    fn landed_missions_return_squadrons() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &["74 Sqn"]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();

        let mut attrition = 0;
        for turn in 1..=5 {
            let mut ctx = TurnContext {
                turn,
                weather: Weather::Clear,
                grid: &grid,
                targets: &targets,
                anti_air: &TargetRatingAntiAir,
                config: &config,
                rng: &mut rng,
            };
            let report = base.advance_missions(&mut ctx);
            assert!(report.failures.is_empty());
            attrition += report.attrition().count();
        }
        assert_eq!(attrition, 1);
        assert!(base.missions().next().is_none());
        assert!(base.squadron("74 Sqn").is_some());
        assert!(
            base.squadrons()
                .iter()
                .all(|s| s.state() == SquadronState::Ready && s.effective_steps() == s.steps())
        );
    }

    #[test]
    fn launch_failures_abort_only_their_mission() {
        let grid = grid();
        let mut targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();
        base.assign_mission(
            MissionId(2),
            &order(MissionVariant::Ferry, "Hawkinge", &["74 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();
        targets.withdraw("Brest");

        let mut ctx = TurnContext {
            turn: 1,
            weather: Weather::Clear,
            grid: &grid,
            targets: &targets,
            anti_air: &TargetRatingAntiAir,
            config: &config,
            rng: &mut rng,
        };
        let report = base.advance_missions(&mut ctx);
        assert_eq!(report.aborted, vec![MissionId(1)]);
        assert!(matches!(
            report.failures[0].1,
            MissionError::TargetNotFound { .. }
        ));
        assert!(base.squadron("22 Sqn").is_some());
        assert!(base.mission(MissionId(2)).is_some());
    }

    #[test]
    fn ferry_produces_a_transfer() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::Ferry, "Hawkinge", &["74 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();

        let mut transfers = Vec::new();
        for turn in 1..=2 {
            let mut ctx = TurnContext {
                turn,
                weather: Weather::Clear,
                grid: &grid,
                targets: &targets,
                anti_air: &TargetRatingAntiAir,
                config: &config,
                rng: &mut rng,
            };
            transfers.extend(base.advance_missions(&mut ctx).transfers);
        }
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].destination, "Hawkinge");
        assert_eq!(transfers[0].squadrons[0].name, "74 Sqn");
        assert!(base.squadron("74 Sqn").is_none());
        assert_eq!(base.squadron_count(), 2);
    }

    #[test]
    fn save_and_restore_keep_missions_in_flight() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::PortStrike, "Brest", &["22 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();
        let mut ctx = TurnContext {
            turn: 1,
            weather: Weather::Clear,
            grid: &grid,
            targets: &targets,
            anti_air: &TargetRatingAntiAir,
            config: &config,
            rng: &mut rng,
        };
        base.advance_missions(&mut ctx);
        let record = base.save();
        assert_eq!(record.squadrons.len(), 3);

        let mut restored = Airbase::new("Manston", "0202", &allies(), 6);
        restored.restore(&record).unwrap();
        assert_eq!(restored.squadrons().len(), 2);
        let mission = restored.mission(MissionId(1)).unwrap();
        assert_eq!(mission.state(), MissionState::OutBound);
        assert_eq!(mission.turns_to_target(), Some(2));
        assert_eq!(restored.save(), record);

        let mut elsewhere = Airbase::new("Hawkinge", "0204", &allies(), 6);
        assert!(matches!(
            elsewhere.restore(&record),
            Err(AssignmentError::UnknownAirbase { .. })
        ));
    }

    #[test]
    fn patrol_on_station_survives_save_and_restore() {
        let grid = grid();
        let targets = targets();
        let config = EngineConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let mut base = manston();
        base.assign_mission(
            MissionId(1),
            &order(MissionVariant::DistantCap, "Force H", &["74 Sqn"], &[]),
            &grid,
            &targets,
            &config,
        )
        .unwrap();

        let mut events = Vec::new();
        for turn in 1..=2 {
            let mut ctx = TurnContext {
                turn,
                weather: Weather::Clear,
                grid: &grid,
                targets: &targets,
                anti_air: &TargetRatingAntiAir,
                config: &config,
                rng: &mut rng,
            };
            events.extend(base.advance_missions(&mut ctx).events);
        }
        assert_eq!(
            events.last(),
            Some(&(
                MissionId(1),
                MissionEvent::Executed(TargetOutcome::Patrolled { squadrons: 1 })
            ))
        );
        let on_station = |base: &Airbase| {
            base.mission(MissionId(1))
                .unwrap()
                .roster()
                .iter()
                .all(|(_, s)| s.state() == SquadronState::Patrolling)
        };
        assert!(on_station(&base));

        let record = base.save();
        let mut restored = Airbase::new("Manston", "0202", &allies(), 6);
        restored.restore(&record).unwrap();
        assert!(on_station(&restored));
        assert_eq!(restored.save(), record);

        let mut ctx = TurnContext {
            turn: 3,
            weather: Weather::Clear,
            grid: &grid,
            targets: &targets,
            anti_air: &TargetRatingAntiAir,
            config: &config,
            rng: &mut rng,
        };
        let report = restored.advance_missions(&mut ctx);
        assert_eq!(report.events, vec![(MissionId(1), MissionEvent::Landed)]);
        assert_eq!(
            restored.squadron("74 Sqn").map(Squadron::state),
            Some(SquadronState::Ready)
        );
    }
}
