//! Airwing Mission Engine
//!
//! Turn-based air operations for a hex-map wargame: squadrons fly strikes,
//! sweeps, patrols, reconnaissance, and ferry flights from airbases along
//! offset-grid flight paths, and suffer anti-aircraft attrition over their
//! targets. The crate has no UI or platform dependencies.

pub mod airbase;
pub mod config;
pub mod dice;
pub mod grid;
pub mod mission;
pub mod numbers;
pub mod path;
pub mod probability;
pub mod record;
pub mod roster;
pub mod squadron;
pub mod target;
pub mod theater;
pub mod variant;
pub mod weather;

// Re-export commonly used types
pub use airbase::{Airbase, AirbaseReport, AssignmentError, MissionOrder, Transfer};
pub use config::{ConfigError, EngineConfig};
pub use dice::{CampaignDice, CountingRng, HitChance, prob_at_least, roll};
pub use grid::{GridCell, GridRef, GridService, OffsetGrid, Point};
pub use mission::{
    Mission, MissionError, MissionEvent, MissionId, MissionState, TargetOutcome, TurnContext,
};
pub use path::{FlightPath, FlightPathKind, FlightPathRecord, PathError, plan_out_bound};
pub use probability::{ProbabilityStats, strike_probability};
pub use record::{AirbaseRecord, MissionRecord, TheaterRecord};
pub use roster::{
    AttritionReport, MissionRole, MissionRoster, RoleAssignment, RosterError, SquadronSource,
};
pub use squadron::{AttackProfile, AttackRating, Squadron, SquadronState, TargetClass};
pub use target::{
    AntiAirModel, Nation, TargetDirectory, TargetRatingAntiAir, TargetRef, TargetSlot,
    VisibleTargets,
};
pub use theater::{GameClock, Theater, TheaterServices, TurnClock, TurnReport};
pub use variant::MissionVariant;
pub use weather::{Weather, WeatherConfig, roll_weather};

/// Trait for abstracting save/load of theater records
/// Platform-specific implementations should provide this
pub trait MissionStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a theater record under a slot name
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be saved.
    fn save_theater(&self, slot: &str, record: &TheaterRecord) -> Result<(), Self::Error>;

    /// Load the record saved under a slot name
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded.
    fn load_theater(&self, slot: &str) -> Result<Option<TheaterRecord>, Self::Error>;

    /// Delete a saved slot
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Campaign driver: tuning, weather, and persistence around a [`Theater`].
pub struct CampaignEngine<S>
where
    S: MissionStorage,
{
    config: EngineConfig,
    storage: S,
}

impl<S> CampaignEngine<S>
where
    S: MissionStorage,
{
    /// Create an engine with validated tuning
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is out of range.
    pub fn new(config: EngineConfig, storage: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, storage })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Services bundle for a theater turn using this engine's tuning.
    #[must_use]
    pub fn services<'a>(
        &'a self,
        grid: &'a dyn GridService,
        targets: &'a dyn TargetDirectory,
        anti_air: &'a dyn AntiAirModel,
    ) -> TheaterServices<'a> {
        TheaterServices {
            grid,
            targets,
            anti_air,
            config: &self.config,
        }
    }

    /// Roll the turn's weather, then fly every mission in the theater.
    pub fn play_turn(
        &self,
        theater: &mut Theater,
        services: &TheaterServices<'_>,
        dice: &mut CampaignDice,
    ) -> TurnReport {
        let weather = roll_weather(&self.config.weather, dice.weather());
        log::debug!("turn {}: {}", theater.current_turn(), weather.label());
        theater.advance_turn(services, weather, dice.attrition())
    }

    /// Save a theater
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be saved.
    pub fn save_theater(&self, slot: &str, theater: &Theater) -> Result<(), S::Error> {
        self.storage.save_theater(slot, &theater.save())
    }

    /// Load a saved slot into `theater`, whose airbases must already be in place
    ///
    /// Returns `false` when the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be loaded or does not fit the theater.
    pub fn load_theater(&self, slot: &str, theater: &mut Theater) -> Result<bool, anyhow::Error> {
        let Some(record) = self.storage.load_theater(slot)? else {
            return Ok(false);
        };
        theater.restore(&record)?;
        Ok(true)
    }

    /// Delete a saved slot
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_save(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        saves: Rc<RefCell<HashMap<String, TheaterRecord>>>,
    }

    impl MissionStorage for MemoryStorage {
        type Error = Infallible;

        fn save_theater(&self, slot: &str, record: &TheaterRecord) -> Result<(), Self::Error> {
            self.saves
                .borrow_mut()
                .insert(slot.to_string(), record.clone());
            Ok(())
        }

        fn load_theater(&self, slot: &str) -> Result<Option<TheaterRecord>, Self::Error> {
            Ok(self.saves.borrow().get(slot).cloned())
        }

        fn delete_save(&self, slot: &str) -> Result<(), Self::Error> {
            self.saves.borrow_mut().remove(slot);
            Ok(())
        }
    }

    fn theater() -> Theater {
        let allies = Nation::new("Allies");
        let mut ark_royal = Airbase::new("Ark Royal", "0503", &allies, 4);
        ark_royal.accept_squadrons([
            Squadron::new("818 NAS", "", "Swordfish", 2, 3).with_attack(AttackProfile {
                land: AttackRating::new(1, 5),
                naval: AttackRating::new(3, 4),
            }),
            Squadron::new("808 NAS", "", "Fulmar", 3, 2),
        ]);
        let mut theater = Theater::new();
        theater.add_airbase(ark_royal);
        theater
    }

    fn targets() -> VisibleTargets {
        let mut targets = VisibleTargets::new();
        let mut bismarck = TargetRef::new("Bismarck", TargetClass::TaskForce, "0507");
        bismarck.anti_air = 2;
        targets.reveal(&Nation::new("Allies"), bismarck);
        targets
    }

    fn strike() -> MissionOrder {
        MissionOrder {
            variant: MissionVariant::TaskForceStrike,
            target: "Bismarck".to_string(),
            squadrons: RoleAssignment::from([
                (MissionRole::Main, vec!["818 NAS".to_string()]),
                (MissionRole::Escort, vec!["808 NAS".to_string()]),
            ]),
        }
    }

    #[test]
    fn engine_saves_and_loads_theater() {
        let engine = CampaignEngine::new(EngineConfig::default(), MemoryStorage::default()).unwrap();
        let grid = OffsetGrid::new(12, 12, 24.0);
        let targets = targets();
        let services = engine.services(&grid, &targets, &TargetRatingAntiAir);
        let mut dice = CampaignDice::from_user_seed(0xA1E);

        let mut theater = theater();
        theater.assign_mission("Ark Royal", &strike(), &services).unwrap();
        engine.play_turn(&mut theater, &services, &mut dice);
        engine.save_theater("slot-one", &theater).unwrap();

        let mut loaded = self::theater();
        assert!(engine.load_theater("slot-one", &mut loaded).unwrap());
        assert_eq!(loaded.save(), theater.save());
        assert!(!engine.load_theater("missing-slot", &mut loaded).unwrap());

        engine.delete_save("slot-one").unwrap();
        assert!(!engine.load_theater("slot-one", &mut loaded).unwrap());
    }

    #[test]
    fn engine_rejects_invalid_config() {
        let config = EngineConfig {
            max_hits: 0,
            ..EngineConfig::default()
        };
        assert!(CampaignEngine::new(config, MemoryStorage::default()).is_err());
    }

    #[test]
    fn same_seed_replays_the_same_campaign() {
        let engine = CampaignEngine::new(EngineConfig::default(), MemoryStorage::default()).unwrap();
        let grid = OffsetGrid::new(12, 12, 24.0);
        let targets = targets();
        let services = engine.services(&grid, &targets, &TargetRatingAntiAir);

        let run = |seed: u64| {
            let mut dice = CampaignDice::from_user_seed(seed);
            let mut theater = theater();
            theater.assign_mission("Ark Royal", &strike(), &services).unwrap();
            (0..5)
                .map(|_| engine.play_turn(&mut theater, &services, &mut dice))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
