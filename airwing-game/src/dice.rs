//! Dice utilities and the seeded random streams used by the campaign.
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Number of faces on the attack die.
pub const DIE_FACES: u8 = 6;

/// Chance for a single attack die to hit, in exact sixths.
///
/// Kept as a whole number of faces so identical chances compare equal when
/// strike dice are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HitChance(u8);

impl HitChance {
    /// Faces that hit when `to_hit` or better is needed, shifted by `modifier`.
    #[must_use]
    pub fn from_to_hit(to_hit: u8, modifier: i32) -> Self {
        let faces = i32::from(DIE_FACES) + 1 - i32::from(to_hit) + modifier;
        let clamped = faces.clamp(0, i32::from(DIE_FACES));
        Self(u8::try_from(clamped).unwrap_or(0))
    }

    #[must_use]
    pub const fn sixths(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn probability(self) -> f64 {
        f64::from(self.0) / f64::from(DIE_FACES)
    }
}

/// Uniform draw in `[1, sides]`; zero sides yields zero without drawing.
///
/// Samples falling in the biased tail are rejected and redrawn.
pub fn roll<R: RngCore + ?Sized>(rng: &mut R, sides: u32) -> u32 {
    if sides == 0 {
        return 0;
    }
    rng.gen_range(1..=sides)
}

/// Probability of at least `successes` hits from `trials` independent dice.
#[must_use]
pub fn prob_at_least(successes: u32, trials: u32, probability: f64) -> f64 {
    if successes == 0 {
        return 1.0;
    }
    if successes > trials {
        return 0.0;
    }
    let p = probability.clamp(0.0, 1.0);
    let q = 1.0 - p;
    let mut total = 0.0;
    for k in successes..=trials {
        total += binomial_coefficient(trials, k) * p.powi(exponent(k)) * q.powi(exponent(trials - k));
    }
    total.clamp(0.0, 1.0)
}

/// Probability of fewer than `successes` hits from `trials` dice.
#[must_use]
pub fn prob_fewer_than(successes: u32, trials: u32, probability: f64) -> f64 {
    (1.0 - prob_at_least(successes, trials, probability)).clamp(0.0, 1.0)
}

fn binomial_coefficient(n: u32, k: u32) -> f64 {
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}

fn exponent(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Independent deterministic streams derived from one campaign seed.
#[derive(Debug, Clone)]
pub struct CampaignDice {
    seed: u64,
    attrition: CountingRng<ChaCha20Rng>,
    weather: CountingRng<ChaCha20Rng>,
}

impl CampaignDice {
    /// Construct the streams from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            attrition: CountingRng::new(derive_stream_seed(seed, b"attrition")),
            weather: CountingRng::new(derive_stream_seed(seed, b"weather")),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream consumed by anti-aircraft resolution.
    pub const fn attrition(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.attrition
    }

    /// Stream consumed by weather rolls.
    pub const fn weather(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.weather
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> [u8; 32] {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed = [0_u8; 32];
    seed.copy_from_slice(&digest);
    seed
}
