use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use airwing_game::{
    Airbase, AttackProfile, AttackRating, CampaignDice, CampaignEngine, EngineConfig, GridCell,
    MissionId, MissionOrder, MissionRole, MissionStorage, MissionVariant, Nation, OffsetGrid,
    ProbabilityStats, RoleAssignment, Squadron, TargetClass, TargetRatingAntiAir, TargetRef, Theater,
    TheaterRecord, TurnClock, TurnReport, VisibleTargets, Weather,
};

/// Save slot used for mid-campaign checkpoints.
const CHECKPOINT_SLOT: &str = "checkpoint";

/// Fixed map, order of battle, and visible targets every scenario flies over.
pub struct Sandbox {
    pub grid: OffsetGrid,
    pub targets: VisibleTargets,
}

impl Sandbox {
    #[must_use]
    pub fn channel() -> Self {
        let allies = Nation::new("Allies");
        let grid = OffsetGrid::new(24, 24, 32.0)
            .with_location("Manston", GridCell::new(4, 4))
            .with_location("Tangmere", GridCell::new(2, 8))
            .with_location("Caen", GridCell::new(5, 10))
            .with_location("Cherbourg", GridCell::new(7, 11))
            .with_location("Brest", GridCell::new(4, 13))
            .with_location("Force K", GridCell::new(9, 6));

        let mut targets = VisibleTargets::new();
        let mut brest = TargetRef::new("Brest", TargetClass::Port, "Brest");
        brest.anti_air = 3;
        brest.in_port = true;
        targets.reveal(&allies, brest);
        let mut cherbourg = TargetRef::new("Cherbourg", TargetClass::Airfield, "Cherbourg");
        cherbourg.anti_air = 2;
        targets.reveal(&allies, cherbourg);
        let mut caen = TargetRef::new("Caen", TargetClass::Land, "Caen");
        caen.anti_air = 1;
        targets.reveal(&allies, caen);
        targets.reveal(
            &allies,
            TargetRef::new("Force K", TargetClass::TaskForce, "Force K"),
        );
        let mut tangmere = TargetRef::new("Tangmere", TargetClass::Airfield, "Tangmere");
        tangmere.capacity = 3;
        targets.reveal(&allies, tangmere);

        Self { grid, targets }
    }

    /// Starting order of battle.
    #[must_use]
    pub fn theater() -> Theater {
        let allies = Nation::new("Allies");
        let mut manston = Airbase::new("Manston", "Manston", &allies, 10);
        manston.accept_squadrons([
            bomber("21 Sqn", 3, 3),
            bomber("82 Sqn", 3, 3),
            bomber("107 Sqn", 4, 2),
            torpedo_bomber("22 Sqn", 3, 2),
            fighter("32 Sqn", 4),
            fighter("56 Sqn", 4),
            fighter("79 Sqn", 5),
        ]);
        let mut tangmere = Airbase::new("Tangmere", "Tangmere", &allies, 6);
        tangmere.accept_squadrons([fighter("43 Sqn", 4)]);

        let mut theater = Theater::new();
        theater.add_airbase(manston);
        theater.add_airbase(tangmere);
        theater
    }
}

fn bomber(name: &str, range: u32, steps: u32) -> Squadron {
    Squadron::new(name, "", "Blenheim", range, steps).with_attack(AttackProfile {
        land: AttackRating::new(2, 4),
        naval: AttackRating::new(1, 5),
    })
}

fn torpedo_bomber(name: &str, range: u32, steps: u32) -> Squadron {
    Squadron::new(name, "", "Beaufort", range, steps).with_attack(AttackProfile {
        land: AttackRating::new(1, 5),
        naval: AttackRating::new(2, 4),
    })
}

fn fighter(name: &str, range: u32) -> Squadron {
    Squadron::new(name, "", "Hurricane", range, 2)
}

/// In-memory save slots for checkpoint scenarios.
#[derive(Clone, Default)]
pub struct MemoryStorage {
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

/// An order issued on a given turn.
#[derive(Debug, Clone)]
pub struct PlannedOrder {
    pub turn: u32,
    pub airbase: &'static str,
    pub order: MissionOrder,
}

impl PlannedOrder {
    #[must_use]
    pub fn new(
        turn: u32,
        airbase: &'static str,
        variant: MissionVariant,
        target: &str,
        main: &[&str],
        escort: &[&str],
    ) -> Self {
        let names = |list: &[&str]| list.iter().map(ToString::to_string).collect::<Vec<_>>();
        Self {
            turn,
            airbase,
            order: MissionOrder {
                variant,
                target: target.to_string(),
                squadrons: RoleAssignment::from([
                    (MissionRole::Main, names(main)),
                    (MissionRole::Escort, names(escort)),
                ]),
            },
        }
    }
}

/// Assertion hook run after a campaign completes.
type CampaignExpectationFn = Arc<dyn Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct CampaignExpectation(CampaignExpectationFn);

impl fmt::Debug for CampaignExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CampaignExpectation").finish()
    }
}

impl CampaignExpectation {
    /// # Errors
    ///
    /// Returns the expectation's failure.
    pub fn evaluate(&self, summary: &CampaignSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for CampaignExpectation
where
    F: Fn(&CampaignSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Orders, recalls, and checks making up one scenario.
#[derive(Debug, Clone)]
pub struct CampaignPlan {
    pub turns: u32,
    /// Fixed weather for every turn; rolled from the seed when `None`.
    pub weather: Option<Weather>,
    pub orders: Vec<PlannedOrder>,
    /// `(turn, order index)` pairs recalled before that turn is flown.
    pub recalls: Vec<(u32, usize)>,
    /// Save and reload the theater before flying this turn.
    pub checkpoint: Option<u32>,
    pub expectations: Vec<CampaignExpectation>,
}

impl CampaignPlan {
    #[must_use]
    pub const fn new(turns: u32) -> Self {
        Self {
            turns,
            weather: None,
            orders: Vec::new(),
            recalls: Vec::new(),
            checkpoint: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: PlannedOrder) -> Self {
        self.orders.push(order);
        self
    }

    #[must_use]
    pub fn with_recall(mut self, turn: u32, order_index: usize) -> Self {
        self.recalls.push((turn, order_index));
        self
    }

    #[must_use]
    pub const fn with_checkpoint(mut self, turn: u32) -> Self {
        self.checkpoint = Some(turn);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<CampaignExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Complete record of a campaign run.
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    pub seed: u64,
    pub reports: Vec<TurnReport>,
    /// Mission id per planned order; `None` when the order was refused.
    pub missions: Vec<Option<MissionId>>,
    /// Pre-launch hit table per planned order, for strikes that were accepted.
    pub estimates: Vec<Option<ProbabilityStats>>,
    pub refused_orders: Vec<String>,
    pub squadrons_before: BTreeSet<String>,
    /// Squadron names per airbase at the end, including those still flying.
    pub squadrons_after: BTreeMap<String, Vec<String>>,
    pub in_flight: usize,
    pub record: TheaterRecord,
    pub attrition_draws: u64,
}

impl CampaignSummary {
    #[must_use]
    pub fn launched(&self) -> usize {
        self.reports.iter().map(|r| r.launched.len()).sum()
    }

    #[must_use]
    pub fn landed(&self) -> usize {
        self.reports.iter().map(|r| r.landed.len()).sum()
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.reports.iter().map(|r| r.executed.len()).sum()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.reports.iter().map(|r| r.failures.len()).sum()
    }

    #[must_use]
    pub fn steps_lost(&self) -> u32 {
        self.reports.iter().map(TurnReport::steps_lost).sum()
    }

    #[must_use]
    pub fn destroyed(&self) -> BTreeSet<String> {
        self.reports
            .iter()
            .flat_map(TurnReport::squadrons_destroyed)
            .map(ToString::to_string)
            .collect()
    }

    #[must_use]
    pub fn stationed_at(&self, airbase: &str) -> &[String] {
        self.squadrons_after
            .get(airbase)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Runs campaign plans against the sandbox theater.
#[derive(Clone, Copy)]
pub struct CampaignTester {
    verbose: bool,
}

impl CampaignTester {
    #[must_use]
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Fly `plan` from a fresh theater with dice derived from `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects its configuration or a checkpoint fails to load.
    pub fn run_plan(&self, plan: &CampaignPlan, seed: u64) -> Result<CampaignSummary> {
        let sandbox = Sandbox::channel();
        let engine = CampaignEngine::new(EngineConfig::default(), MemoryStorage::default())
            .context("engine configuration")?;
        let services = engine.services(&sandbox.grid, &sandbox.targets, &TargetRatingAntiAir);
        let mut dice = CampaignDice::from_user_seed(seed);
        let mut theater = Sandbox::theater();
        let squadrons_before = stationed(&theater).into_values().flatten().collect();

        let mut missions = vec![None; plan.orders.len()];
        let mut estimates = vec![None; plan.orders.len()];
        let mut refused_orders = Vec::new();
        let mut reports = Vec::new();

        for _ in 0..plan.turns {
            let turn = theater.current_turn();
            for (index, planned) in plan.orders.iter().enumerate() {
                if planned.turn != turn {
                    continue;
                }
                match theater.assign_mission(planned.airbase, &planned.order, &services) {
                    Ok(id) => {
                        missions[index] = Some(id);
                        let weather = plan.weather.unwrap_or_default();
                        estimates[index] = theater
                            .strike_probability(id, &services, weather)
                            .context("strike estimate")?;
                    }
                    Err(err) => refused_orders.push(format!(
                        "turn {turn}: {} {} -> {err}",
                        planned.order.variant, planned.order.target
                    )),
                }
            }
            for &(recall_turn, index) in &plan.recalls {
                if recall_turn != turn {
                    continue;
                }
                if let Some(id) = missions.get(index).copied().flatten()
                    && let Err(err) = theater.recall_mission(id)
                {
                    log::warn!("recall of {id} refused: {err}");
                }
            }
            if plan.checkpoint == Some(turn) {
                engine
                    .save_theater(CHECKPOINT_SLOT, &theater)
                    .context("saving checkpoint")?;
                let mut reloaded = Sandbox::theater();
                let found = engine
                    .load_theater(CHECKPOINT_SLOT, &mut reloaded)
                    .context("loading checkpoint")?;
                anyhow::ensure!(found, "checkpoint slot was empty");
                theater = reloaded;
            }

            let report = match plan.weather {
                Some(weather) => theater.advance_turn(&services, weather, dice.attrition()),
                None => engine.play_turn(&mut theater, &services, &mut dice),
            };
            if self.verbose {
                log_turn(&report);
            }
            reports.push(report);
        }

        Ok(CampaignSummary {
            seed,
            reports,
            missions,
            estimates,
            refused_orders,
            squadrons_before,
            squadrons_after: stationed(&theater),
            in_flight: theater.missions().count(),
            record: theater.save(),
            attrition_draws: dice.attrition().draws(),
        })
    }
}

fn stationed(theater: &Theater) -> BTreeMap<String, Vec<String>> {
    theater
        .airbases()
        .map(|airbase| {
            let mut names: Vec<String> = airbase.squadrons().iter().map(|s| s.name.clone()).collect();
            for mission in airbase.missions() {
                names.extend(mission.roster().iter().map(|(_, s)| s.name.clone()));
            }
            (airbase.name.clone(), names)
        })
        .collect()
}

fn log_turn(report: &TurnReport) {
    println!(
        "    turn {:>2} {:<8} launched {} arrived {} executed {} landed {} lost {}",
        report.turn,
        report.weather.label(),
        report.launched.len(),
        report.arrived.len(),
        report.executed.len(),
        report.landed.len(),
        report.steps_lost()
    );
}
