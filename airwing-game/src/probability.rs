//! Pre-flight strike estimates.
//!
//! Squadrons sharing a hit chance pool their attack dice. Each pool is then
//! treated as an independent attempt to reach the hit count on its own, so
//! the chance of at least `h` hits is one minus the product of every pool
//! falling short. Hits are not summed across pools.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dice::{HitChance, prob_fewer_than};
use crate::numbers::probability_to_percent;
use crate::squadron::{Squadron, TargetClass};
use crate::target::TargetRef;

/// Hit-count to percentage table shown before a strike launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityStats {
    pub title: String,
    pub event_label: String,
    rows: BTreeMap<u32, u8>,
}

impl ProbabilityStats {
    #[must_use]
    pub const fn rows(&self) -> &BTreeMap<u32, u8> {
        &self.rows
    }

    /// Percentage chance of at least `hits` hits; zero outside the table.
    #[must_use]
    pub fn percent(&self, hits: u32) -> u8 {
        self.rows.get(&hits).copied().unwrap_or(0)
    }
}

/// Attack dice pooled by identical hit chance.
#[must_use]
pub fn group_by_chance(
    squadrons: &[Squadron],
    class: TargetClass,
    modifier: i32,
) -> BTreeMap<HitChance, u32> {
    let mut groups = BTreeMap::new();
    for squadron in squadrons {
        let factor = squadron.attack_factor(class);
        if factor == 0 {
            continue;
        }
        *groups
            .entry(squadron.hit_chance(class, modifier))
            .or_insert(0_u32) += factor;
    }
    groups
}

/// Chance of at least `h` hits for each `h` in `1..=max_hits`.
#[must_use]
pub fn hit_distribution(groups: &BTreeMap<HitChance, u32>, max_hits: u32) -> BTreeMap<u32, u8> {
    (1..=max_hits)
        .map(|hits| {
            let all_short: f64 = groups
                .iter()
                .map(|(chance, dice)| prob_fewer_than(hits, *dice, chance.probability()))
                .product();
            (hits, probability_to_percent(1.0 - all_short))
        })
        .collect()
}

/// Estimate for the main force striking `target`.
#[must_use]
pub fn strike_probability(
    squadrons: &[Squadron],
    target: &TargetRef,
    modifier: i32,
    max_hits: u32,
) -> ProbabilityStats {
    let groups = group_by_chance(squadrons, target.class, modifier);
    ProbabilityStats {
        title: format!("Strike on {}", target.name),
        event_label: String::from("Hits"),
        rows: hit_distribution(&groups, max_hits),
    }
}
