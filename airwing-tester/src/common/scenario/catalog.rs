use anyhow::{Result, ensure};
use std::collections::BTreeSet;

use airwing_game::{MissionVariant, TargetOutcome, Weather};

use crate::logic::campaign::{CampaignPlan, CampaignSummary, CampaignTester, PlannedOrder};

/// Every squadron is either stationed somewhere exactly once or was shot down.
pub fn squadrons_conserved(summary: &CampaignSummary) -> Result<()> {
    let after: Vec<&String> = summary.squadrons_after.values().flatten().collect();
    let unique: BTreeSet<String> = after.iter().map(|name| (*name).clone()).collect();
    ensure!(
        unique.len() == after.len(),
        "a squadron is owned twice: {after:?}"
    );
    let destroyed = summary.destroyed();
    ensure!(
        unique.is_disjoint(&destroyed),
        "destroyed squadrons still on strength: {:?}",
        unique.intersection(&destroyed).collect::<Vec<_>>()
    );
    let accounted: BTreeSet<String> = unique.union(&destroyed).cloned().collect();
    ensure!(
        accounted == summary.squadrons_before,
        "squadrons appeared or vanished: before {:?} after {:?}",
        summary.squadrons_before,
        accounted
    );
    Ok(())
}

fn all_orders_accepted(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.refused_orders.is_empty(),
        "orders refused: {:?}",
        summary.refused_orders
    );
    ensure!(summary.failures() == 0, "missions failed in flight");
    Ok(())
}

fn everyone_home(summary: &CampaignSummary) -> Result<()> {
    ensure!(
        summary.in_flight == 0,
        "{} missions still in flight",
        summary.in_flight
    );
    ensure!(
        summary.landed() == summary.launched(),
        "launched {} but landed {}",
        summary.launched(),
        summary.landed()
    );
    Ok(())
}

fn outcomes(summary: &CampaignSummary) -> impl Iterator<Item = &TargetOutcome> {
    summary
        .reports
        .iter()
        .flat_map(|report| report.executed.iter().map(|(_, outcome)| outcome))
}

pub fn smoke() -> CampaignPlan {
    CampaignPlan::new(6)
        .with_weather(Weather::Clear)
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::PortRecon,
            "Brest",
            &["32 Sqn"],
            &[],
        ))
        .with_expectation(all_orders_accepted)
        .with_expectation(everyone_home)
        .with_expectation(|summary: &CampaignSummary| {
            ensure!(
                outcomes(summary).any(
                    |outcome| matches!(outcome, TargetOutcome::Observed { target } if target == "Brest")
                ),
                "recon never observed Brest"
            );
            ensure!(summary.steps_lost() == 0, "recon should not take losses");
            Ok(())
        })
}

fn strike_orders() -> CampaignPlan {
    CampaignPlan::new(8).with_order(PlannedOrder::new(
        1,
        "Manston",
        MissionVariant::PortStrike,
        "Brest",
        &["21 Sqn", "82 Sqn"],
        &["32 Sqn"],
    ))
}

pub fn strike_package() -> CampaignPlan {
    strike_orders()
        .with_expectation(all_orders_accepted)
        .with_expectation(everyone_home)
        .with_expectation(squadrons_conserved)
        .with_expectation(|summary: &CampaignSummary| {
            ensure!(summary.executed() == 1, "strike should reach Brest once");
            ensure!(
                outcomes(summary).all(|outcome| matches!(outcome, TargetOutcome::Attrition(_))),
                "strike should run the defences"
            );
            ensure!(summary.attrition_draws > 0, "anti-air never rolled");
            Ok(())
        })
}

pub fn sweep_and_cap() -> CampaignPlan {
    CampaignPlan::new(8)
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::AirfieldSweep,
            "Cherbourg",
            &["56 Sqn"],
            &[],
        ))
        .with_order(PlannedOrder::new(
            2,
            "Manston",
            MissionVariant::DistantCap,
            "Force K",
            &["79 Sqn"],
            &[],
        ))
        .with_expectation(all_orders_accepted)
        .with_expectation(everyone_home)
        .with_expectation(squadrons_conserved)
        .with_expectation(|summary: &CampaignSummary| {
            ensure!(
                outcomes(summary)
                    .any(|outcome| matches!(outcome, TargetOutcome::Patrolled { squadrons: 1 })),
                "patrol over Force K missing"
            );
            ensure!(
                summary.reports[0].launched.len() == 1 && summary.reports[1].launched.len() == 1,
                "orders should launch on the turn they are given"
            );
            Ok(())
        })
}

pub fn ferry_transfer() -> CampaignPlan {
    CampaignPlan::new(4)
        .with_weather(Weather::Overcast)
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::Ferry,
            "Tangmere",
            &["107 Sqn"],
            &[],
        ))
        .with_expectation(all_orders_accepted)
        .with_expectation(everyone_home)
        .with_expectation(squadrons_conserved)
        .with_expectation(|summary: &CampaignSummary| {
            ensure!(
                summary.stationed_at("Tangmere").iter().any(|name| name == "107 Sqn"),
                "107 Sqn never reached Tangmere"
            );
            ensure!(
                !summary.stationed_at("Manston").iter().any(|name| name == "107 Sqn"),
                "107 Sqn is still at Manston"
            );
            let delivered = summary
                .reports
                .iter()
                .filter_map(|report| report.deliveries.get("Tangmere"))
                .flatten()
                .count();
            ensure!(delivered == 1, "expected one delivery, saw {delivered}");
            Ok(())
        })
}

pub fn recall() -> CampaignPlan {
    CampaignPlan::new(6)
        .with_weather(Weather::Clear)
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::PortStrike,
            "Brest",
            &["21 Sqn"],
            &[],
        ))
        .with_recall(3, 0)
        .with_expectation(all_orders_accepted)
        .with_expectation(everyone_home)
        .with_expectation(|summary: &CampaignSummary| {
            ensure!(summary.executed() == 0, "recalled strike reached its target");
            ensure!(summary.steps_lost() == 0, "recalled strike took losses");
            let landed_on = summary
                .reports
                .iter()
                .find(|report| !report.landed.is_empty())
                .map(|report| report.turn);
            ensure!(
                landed_on == Some(4),
                "recalled strike should land on turn 4, landed {landed_on:?}"
            );
            Ok(())
        })
}

pub fn deterministic() -> CampaignPlan {
    strike_orders()
        .with_order(PlannedOrder::new(
            2,
            "Manston",
            MissionVariant::LandStrike,
            "Caen",
            &["107 Sqn"],
            &["56 Sqn"],
        ))
        .with_expectation(|summary: &CampaignSummary| {
            let plan = strike_orders().with_order(PlannedOrder::new(
                2,
                "Manston",
                MissionVariant::LandStrike,
                "Caen",
                &["107 Sqn"],
                &["56 Sqn"],
            ));
            let replay = CampaignTester::new(false).run_plan(&plan, summary.seed)?;
            ensure!(
                replay.reports == summary.reports,
                "turn reports differ on replay"
            );
            ensure!(replay.record == summary.record, "final theater differs on replay");
            ensure!(
                replay.attrition_draws == summary.attrition_draws,
                "attrition stream consumed {} draws, replay {}",
                summary.attrition_draws,
                replay.attrition_draws
            );
            Ok(())
        })
}

pub fn save_restore() -> CampaignPlan {
    strike_orders()
        .with_checkpoint(3)
        .with_expectation(squadrons_conserved)
        .with_expectation(|summary: &CampaignSummary| {
            let uninterrupted = CampaignTester::new(false).run_plan(&strike_orders(), summary.seed)?;
            ensure!(
                uninterrupted.reports == summary.reports,
                "reloading mid-flight changed the turn reports"
            );
            ensure!(
                uninterrupted.record == summary.record,
                "reloading mid-flight changed the final theater"
            );
            Ok(())
        })
}

pub fn strike_estimate() -> CampaignPlan {
    CampaignPlan::new(1)
        .with_weather(Weather::Clear)
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::LandStrike,
            "Caen",
            &["107 Sqn"],
            &[],
        ))
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::TaskForceStrike,
            "Force K",
            &["22 Sqn"],
            &[],
        ))
        .with_order(PlannedOrder::new(
            1,
            "Manston",
            MissionVariant::PortRecon,
            "Brest",
            &["32 Sqn"],
            &[],
        ))
        .with_expectation(all_orders_accepted)
        .with_expectation(|summary: &CampaignSummary| {
            let [land, naval, recon] = summary.estimates.as_slice() else {
                anyhow::bail!("expected three estimates");
            };
            ensure!(recon.is_none(), "recon should have no hit table");
            for (label, stats) in [("land", land), ("naval", naval)] {
                let Some(stats) = stats else {
                    anyhow::bail!("{label} strike has no hit table");
                };
                ensure!(stats.percent(1) > 0, "{label} strike cannot hit");
                ensure!(stats.percent(1) <= 100, "{label} strike above certainty");
                let mut previous = stats.percent(1);
                for hits in 2..=4 {
                    let current = stats.percent(hits);
                    ensure!(
                        current <= previous,
                        "{label} table rises at {hits} hits: {:?}",
                        stats.rows()
                    );
                    previous = current;
                }
            }
            Ok(())
        })
}
