//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Convert a probability in `[0, 1]` to a rounded whole percentage.
///
/// Non-finite input maps to 0.
#[must_use]
pub fn probability_to_percent(probability: f64) -> u8 {
    if !probability.is_finite() {
        return 0;
    }
    let scaled = (probability.clamp(0.0, 1.0) * 100.0).round();
    cast::<f64, u8>(scaled).unwrap_or(0)
}

/// Ceiling division used for turn counts; a zero divisor yields zero.
#[must_use]
pub const fn ceil_div(distance: u32, range: u32) -> u32 {
    if range == 0 {
        return 0;
    }
    distance / range + if distance % range > 0 { 1 } else { 0 }
}

/// Convert a collection length to `u32`, saturating on overflow.
#[must_use]
pub fn len_to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f64_to_i32(1.6), 2);
        assert_eq!(round_f64_to_i32(-2.5), -3);
        assert_eq!(round_f64_to_i32(f64::NAN), 0);
        assert_eq!(round_f64_to_i32(f64::from(i32::MAX) * 2.0), i32::MAX);
    }

    #[test]
    fn percent_clamps_and_handles_nan() {
        assert_eq!(probability_to_percent(0.424), 42);
        assert_eq!(probability_to_percent(0.995), 100);
        assert_eq!(probability_to_percent(1.7), 100);
        assert_eq!(probability_to_percent(-0.3), 0);
        assert_eq!(probability_to_percent(f64::NAN), 0);
    }

    #[test]
    fn ceil_div_matches_turn_rule() {
        assert_eq!(ceil_div(5, 3), 2);
        assert_eq!(ceil_div(6, 3), 2);
        assert_eq!(ceil_div(0, 3), 0);
        assert_eq!(ceil_div(7, 0), 0);
    }
}
