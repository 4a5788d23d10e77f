//! Theater: every airbase in play, the turn clock, and the ferry network.
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::airbase::{Airbase, AirbaseReport, AssignmentError, MissionOrder, Transfer};
use crate::config::EngineConfig;
use crate::grid::GridService;
use crate::mission::{Mission, MissionError, MissionEvent, MissionId, TargetOutcome, TurnContext};
use crate::probability::ProbabilityStats;
use crate::record::TheaterRecord;
use crate::roster::AttritionReport;
use crate::target::{AntiAirModel, TargetDirectory};
use crate::weather::Weather;

/// Source of the current turn number.
pub trait TurnClock {
    fn current_turn(&self) -> u32;
}

/// Monotonic turn counter starting at turn 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    turn: u32,
}

impl GameClock {
    #[must_use]
    pub const fn starting_at(turn: u32) -> Self {
        Self { turn }
    }

    pub const fn tick(&mut self) {
        self.turn = self.turn.saturating_add(1);
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl TurnClock for GameClock {
    fn current_turn(&self) -> u32 {
        self.turn
    }
}

/// Map, targets, defences, and tuning shared by every airbase.
#[derive(Clone, Copy)]
pub struct TheaterServices<'a> {
    pub grid: &'a dyn GridService,
    pub targets: &'a dyn TargetDirectory,
    pub anti_air: &'a dyn AntiAirModel,
    pub config: &'a EngineConfig,
}

/// A mission failure reported for the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionFailure {
    pub airbase: String,
    pub mission: MissionId,
    pub error: MissionError,
    pub aborted: bool,
}

/// Summary of one theater turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: u32,
    pub weather: Weather,
    pub launched: Vec<MissionId>,
    pub arrived: Vec<MissionId>,
    pub executed: Vec<(MissionId, TargetOutcome)>,
    pub landed: Vec<MissionId>,
    pub failures: Vec<MissionFailure>,
    /// Squadron names delivered by ferry, keyed by destination airbase.
    pub deliveries: BTreeMap<String, Vec<String>>,
}

impl TurnReport {
    #[must_use]
    pub fn steps_lost(&self) -> u32 {
        self.attrition().map(|report| report.steps_lost).sum()
    }

    #[must_use]
    pub fn squadrons_destroyed(&self) -> Vec<&str> {
        self.attrition()
            .flat_map(|report| report.destroyed.iter().map(String::as_str))
            .collect()
    }

    fn attrition(&self) -> impl Iterator<Item = &AttritionReport> {
        self.executed.iter().filter_map(|(_, outcome)| match outcome {
            TargetOutcome::Attrition(report) => Some(report),
            _ => None,
        })
    }

    fn absorb(&mut self, airbase: &str, report: AirbaseReport) {
        for (id, event) in report.events {
            match event {
                MissionEvent::Launched { .. } => self.launched.push(id),
                MissionEvent::ArrivedAtTarget { .. } => self.arrived.push(id),
                MissionEvent::Executed(outcome) => {
                    if matches!(outcome, TargetOutcome::Ferried { .. }) {
                        self.landed.push(id);
                    }
                    self.executed.push((id, outcome));
                }
                MissionEvent::Landed => self.landed.push(id),
                MissionEvent::EnRoute { .. } | MissionEvent::Homebound { .. } | MissionEvent::Idle => {}
            }
        }
        for (id, error) in report.failures {
            self.failures.push(MissionFailure {
                airbase: airbase.to_string(),
                mission: id,
                aborted: report.aborted.contains(&id),
                error,
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theater {
    airbases: BTreeMap<String, Airbase>,
    next_mission_id: u32,
    clock: GameClock,
}

impl Default for Theater {
    fn default() -> Self {
        Self::new()
    }
}

impl Theater {
    #[must_use]
    pub fn new() -> Self {
        Self {
            airbases: BTreeMap::new(),
            next_mission_id: 1,
            clock: GameClock::default(),
        }
    }

    pub fn add_airbase(&mut self, airbase: Airbase) {
        self.airbases.insert(airbase.name.clone(), airbase);
    }

    #[must_use]
    pub fn airbase(&self, name: &str) -> Option<&Airbase> {
        self.airbases.get(name)
    }

    pub fn airbase_mut(&mut self, name: &str) -> Option<&mut Airbase> {
        self.airbases.get_mut(name)
    }

    pub fn airbases(&self) -> impl Iterator<Item = &Airbase> {
        self.airbases.values()
    }

    pub fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.airbases.values().flat_map(Airbase::missions)
    }

    #[must_use]
    pub fn mission(&self, id: MissionId) -> Option<&Mission> {
        self.missions().find(|mission| mission.id() == id)
    }

    fn base_of(&mut self, id: MissionId) -> Result<&mut Airbase, AssignmentError> {
        self.airbases
            .values_mut()
            .find(|airbase| airbase.mission(id).is_some())
            .ok_or(AssignmentError::UnknownMission { id })
    }

    fn base_named(&mut self, name: &str) -> Result<&mut Airbase, AssignmentError> {
        self.airbases
            .get_mut(name)
            .ok_or_else(|| AssignmentError::UnknownAirbase {
                name: name.to_string(),
            })
    }

    /// Order a mission from `airbase`; ids are unique across the theater.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` if the airbase is unknown or rejects the order.
    pub fn assign_mission(
        &mut self,
        airbase: &str,
        order: &MissionOrder,
        services: &TheaterServices<'_>,
    ) -> Result<MissionId, AssignmentError> {
        let id = MissionId(self.next_mission_id);
        self.base_named(airbase)?.assign_mission(
            id,
            order,
            services.grid,
            services.targets,
            services.config,
        )?;
        self.next_mission_id += 1;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown or launched missions.
    pub fn cancel_mission(&mut self, id: MissionId) -> Result<(), AssignmentError> {
        self.base_of(id)?.cancel_mission(id)
    }

    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown missions or ones that cannot turn back.
    pub fn recall_mission(&mut self, id: MissionId) -> Result<u32, AssignmentError> {
        let turn = self.clock.current_turn();
        self.base_of(id)?.recall_mission(id, turn)
    }

    /// # Errors
    ///
    /// Returns `AssignmentError` for unknown missions or unresolved targets.
    pub fn strike_probability(
        &mut self,
        id: MissionId,
        services: &TheaterServices<'_>,
        weather: Weather,
    ) -> Result<Option<ProbabilityStats>, AssignmentError> {
        self.base_of(id)?
            .strike_probability(id, services.targets, services.config, weather)
    }

    /// Fly one turn for every airbase, then deliver ferried squadrons.
    pub fn advance_turn(
        &mut self,
        services: &TheaterServices<'_>,
        weather: Weather,
        rng: &mut dyn RngCore,
    ) -> TurnReport {
        let turn = self.clock.current_turn();
        let mut report = TurnReport {
            turn,
            weather,
            ..TurnReport::default()
        };
        let mut transfers = Vec::new();
        for (name, airbase) in &mut self.airbases {
            let mut ctx = TurnContext {
                turn,
                weather,
                grid: services.grid,
                targets: services.targets,
                anti_air: services.anti_air,
                config: services.config,
                rng: &mut *rng,
            };
            let mut base_report = airbase.advance_missions(&mut ctx);
            transfers.append(&mut base_report.transfers);
            report.absorb(name, base_report);
        }
        for transfer in transfers {
            self.deliver(transfer, &mut report);
        }
        self.clock.tick();
        report
    }

    fn deliver(&mut self, transfer: Transfer, report: &mut TurnReport) {
        let Transfer {
            mission,
            origin,
            destination,
            squadrons,
        } = transfer;
        let names: Vec<String> = squadrons.iter().map(|s| s.name.clone()).collect();
        if let Some(airbase) = self.airbases.get_mut(&destination) {
            airbase.accept_squadrons(squadrons);
            report
                .deliveries
                .entry(destination)
                .or_default()
                .extend(names);
        } else if let Some(airbase) = self.airbases.get_mut(&origin) {
            log::warn!("{mission} ferried to unknown airbase {destination}, returning to {origin}");
            airbase.accept_squadrons(squadrons);
            report.deliveries.entry(origin).or_default().extend(names);
        } else {
            log::warn!("{mission} ferried squadrons {names:?} have nowhere to land");
        }
    }

    #[must_use]
    pub fn save(&self) -> TheaterRecord {
        TheaterRecord {
            turn: self.clock.current_turn(),
            next_mission_id: self.next_mission_id,
            airbases: self.airbases.values().map(Airbase::save).collect(),
        }
    }

    /// Restore missions and squadrons into airbases already in the theater.
    ///
    /// # Errors
    ///
    /// Returns `AssignmentError` if the record names an unknown airbase or
    /// squadron.
    pub fn restore(&mut self, record: &TheaterRecord) -> Result<(), AssignmentError> {
        let mut staging = self.clone();
        for saved in &record.airbases {
            staging.base_named(&saved.name)?.restore(saved)?;
        }
        staging.next_mission_id = record.next_mission_id;
        staging.clock = GameClock::starting_at(record.turn);
        *self = staging;
        Ok(())
    }
}

impl TurnClock for Theater {
    fn current_turn(&self) -> u32 {
        self.clock.current_turn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::OffsetGrid;
    use crate::roster::{MissionRole, RoleAssignment};
    use crate::squadron::{Squadron, TargetClass};
    use crate::target::{Nation, TargetRatingAntiAir, TargetRef, VisibleTargets};
    use crate::variant::MissionVariant;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        grid: OffsetGrid,
        targets: VisibleTargets,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let allies = Nation::new("Allies");
            let mut targets = VisibleTargets::new();
            let mut detling = TargetRef::new("Detling", TargetClass::Airfield, "0205");
            detling.capacity = 4;
            targets.reveal(&allies, detling);
            let mut brest = TargetRef::new("Brest", TargetClass::Port, "0207");
            brest.anti_air = 1;
            targets.reveal(&allies, brest);
            Self {
                grid: OffsetGrid::new(20, 20, 24.0),
                targets,
                config: EngineConfig::default(),
            }
        }

        fn services(&self) -> TheaterServices<'_> {
            TheaterServices {
                grid: &self.grid,
                targets: &self.targets,
                anti_air: &TargetRatingAntiAir,
                config: &self.config,
            }
        }
    }

    fn theater() -> Theater {
        let allies = Nation::new("Allies");
        let mut manston = Airbase::new("Manston", "0202", &allies, 6);
        manston.accept_squadrons([
            Squadron::new("22 Sqn", "", "Beaufort", 3, 2),
            Squadron::new("74 Sqn", "", "Spitfire", 3, 2),
        ]);
        let mut theater = Theater::new();
        theater.add_airbase(manston);
        theater.add_airbase(Airbase::new("Detling", "0205", &allies, 4));
        theater
    }

    fn order(variant: MissionVariant, target: &str, squadron: &str) -> MissionOrder {
        MissionOrder {
            variant,
            target: target.to_string(),
            squadrons: RoleAssignment::from([(MissionRole::Main, vec![squadron.to_string()])]),
        }
    }

    #[test]
    fn mission_ids_are_unique_across_airbases() {
        let fixture = Fixture::new();
        let services = fixture.services();
        let mut theater = theater();
        let first = theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "22 Sqn"), &services)
            .unwrap();
        let rejected = theater.assign_mission(
            "Manston",
            &order(MissionVariant::PortStrike, "Brest", "22 Sqn"),
            &services,
        );
        assert!(rejected.is_err());
        let second = theater
            .assign_mission("Manston", &order(MissionVariant::PortRecon, "Brest", "74 Sqn"), &services)
            .unwrap();
        assert_eq!(first, MissionId(1));
        assert_eq!(second, MissionId(2));
        assert!(matches!(
            theater.assign_mission("Biggin Hill", &order(MissionVariant::PortRecon, "Brest", "74 Sqn"), &services),
            Err(AssignmentError::UnknownAirbase { .. })
        ));
    }

    #[test]
    fn ferried_squadrons_join_their_destination() {
        let fixture = Fixture::new();
        let services = fixture.services();
        let mut theater = theater();
        theater
            .assign_mission("Manston", &order(MissionVariant::Ferry, "Detling", "74 Sqn"), &services)
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let first = theater.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(first.turn, 1);
        assert_eq!(first.launched, vec![MissionId(1)]);
        let second = theater.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(second.landed, vec![MissionId(1)]);
        assert_eq!(
            second.deliveries.get("Detling"),
            Some(&vec!["74 Sqn".to_string()])
        );
        let detling = theater.airbase("Detling").unwrap();
        assert_eq!(detling.squadron("74 Sqn").unwrap().home, "Detling");
        assert!(theater.airbase("Manston").unwrap().squadron("74 Sqn").is_none());
        assert_eq!(theater.current_turn(), 3);
    }

    #[test]
    fn recall_uses_the_theater_clock() {
        let fixture = Fixture::new();
        let services = fixture.services();
        let mut theater = theater();
        let id = theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "22 Sqn"), &services)
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        theater.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(theater.recall_mission(id).unwrap(), 2);
        let report = theater.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(report.landed, vec![id]);
        assert!(theater.mission(id).is_none());
        assert_eq!(
            theater.recall_mission(id),
            Err(AssignmentError::UnknownMission { id })
        );
    }

    #[test]
    fn strike_report_counts_losses() {
        let fixture = Fixture::new();
        let services = fixture.services();
        let mut theater = theater();
        let id = theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "22 Sqn"), &services)
            .unwrap();
        let stats = theater
            .strike_probability(id, &services, Weather::Clear)
            .unwrap();
        assert!(stats.is_some());

        let mut rng = ChaCha20Rng::seed_from_u64(13);
        let reports: Vec<TurnReport> = (0..4)
            .map(|_| theater.advance_turn(&services, Weather::Clear, &mut rng))
            .collect();
        assert_eq!(reports[2].executed.len(), 1);
        // One step turned away, no step lost: half of one rounds down.
        assert_eq!(reports[2].steps_lost(), 0);
        assert!(reports[2].squadrons_destroyed().is_empty());
        assert_eq!(reports[3].landed, vec![id]);
    }

    #[test]
    fn save_and_restore_round_trip() {
        let fixture = Fixture::new();
        let services = fixture.services();
        let mut theater = theater();
        theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "22 Sqn"), &services)
            .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(14);
        theater.advance_turn(&services, Weather::Clear, &mut rng);
        let record = theater.save();

        let json = record.to_json().unwrap();
        let parsed = TheaterRecord::from_json(&json).unwrap();
        let mut restored = self::theater();
        restored.restore(&parsed).unwrap();
        assert_eq!(restored.current_turn(), 2);
        assert_eq!(restored.save(), record);

        let next = restored
            .assign_mission("Manston", &order(MissionVariant::PortRecon, "Brest", "74 Sqn"), &services)
            .unwrap();
        assert_eq!(next, MissionId(2));
    }

    #[test]
    fn reloaded_strike_comes_home_after_its_target_is_lost() {
        let mut fixture = Fixture::new();
        let mut theater = theater();
        let mut rng = ChaCha20Rng::seed_from_u64(15);
        let services = fixture.services();
        let recalled = theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "22 Sqn"), &services)
            .unwrap();
        let pressed_on = theater
            .assign_mission("Manston", &order(MissionVariant::PortStrike, "Brest", "74 Sqn"), &services)
            .unwrap();
        theater.advance_turn(&services, Weather::Clear, &mut rng);
        let record = theater.save();

        fixture.targets.withdraw("Brest");
        let services = fixture.services();
        let mut restored = self::theater();
        restored.restore(&record).unwrap();
        assert_eq!(restored.recall_mission(recalled).unwrap(), 2);

        let second = restored.advance_turn(&services, Weather::Clear, &mut rng);
        assert!(second.failures.is_empty());
        assert_eq!(second.landed, vec![recalled]);
        assert_eq!(second.arrived, vec![pressed_on]);

        let third = restored.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(third.failures.len(), 1);
        assert_eq!(third.failures[0].mission, pressed_on);
        assert!(!third.failures[0].aborted);
        assert!(matches!(
            third.failures[0].error,
            MissionError::TargetNotFound { .. }
        ));

        let fourth = restored.advance_turn(&services, Weather::Clear, &mut rng);
        assert_eq!(fourth.landed, vec![pressed_on]);
        assert_eq!(restored.missions().count(), 0);
        let manston = restored.airbase("Manston").unwrap();
        assert!(manston.squadron("22 Sqn").is_some());
        assert!(manston.squadron("74 Sqn").is_some());
    }
}
