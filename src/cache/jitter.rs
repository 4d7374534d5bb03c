//! TTL jitter
//!
//! Entries written together would otherwise expire together and stampede the
//! generator again. Every write perturbs its TTL by up to ±10%.

/// Maximum relative perturbation applied to a TTL
pub const JITTER_RATIO: f64 = 0.10;

/// Perturb `ttl_seconds` by a uniform factor in `[0.9, 1.1]`, floored at 1s
pub fn jittered_ttl_seconds(ttl_seconds: u64) -> u64 {
    jitter_with(ttl_seconds, fastrand::f64())
}

/// Deterministic core of [`jittered_ttl_seconds`]; `unit` is in `[0, 1)`
fn jitter_with(ttl_seconds: u64, unit: f64) -> u64 {
    let factor = 1.0 + (unit * 2.0 - 1.0) * JITTER_RATIO;
    let jittered = (ttl_seconds as f64 * factor).round();
    (jittered as u64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extremes_stay_in_bounds() {
        assert_eq!(jitter_with(3600, 0.0), 3240);
        assert_eq!(jitter_with(3600, 0.5), 3600);
        assert!(jitter_with(3600, 0.999_999) <= 3960);
    }

    #[test]
    fn test_floor_of_one_second() {
        assert_eq!(jitter_with(1, 0.0), 1);
        assert_eq!(jitter_with(0, 0.7), 1);
    }

    proptest! {
        #[test]
        fn prop_jitter_within_ten_percent(ttl in 10u64..10_000_000, unit in 0.0f64..1.0) {
            let jittered = jitter_with(ttl, unit) as f64;
            let ttl = ttl as f64;
            prop_assert!(jittered >= (ttl * 0.9).floor());
            prop_assert!(jittered <= (ttl * 1.1).ceil());
        }
    }
}
