/// Number of stake tiers.
pub const TIER_COUNT: usize = 5;

/// Map a stake amount to its tier (0..=4). Ranges are half-open:
/// [0, 25k), [25k, 62.5k), [62.5k, 125k), [125k, 250k), [250k, inf).
pub fn classify_tier(amount: f64) -> u8 {
    if amount < 25_000.0 {
        0
    } else if amount < 62_500.0 {
        1
    } else if amount < 125_000.0 {
        2
    } else if amount < 250_000.0 {
        3
    } else {
        4
    }
}

pub fn tier_label(tier: u8) -> String {
    format!("Tier {tier}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(classify_tier(0.0), 0);
        assert_eq!(classify_tier(24_999.99), 0);
        assert_eq!(classify_tier(25_000.0), 1);
        assert_eq!(classify_tier(62_499.999), 1);
        assert_eq!(classify_tier(62_500.0), 2);
        assert_eq!(classify_tier(125_000.0), 3);
        assert_eq!(classify_tier(249_999.0), 3);
        assert_eq!(classify_tier(250_000.0), 4);
        assert_eq!(classify_tier(1e12), 4);
    }

    #[test]
    fn test_tiers_are_monotonic_and_exhaustive() {
        let mut prev = 0;
        let mut x = 0.0;
        while x < 400_000.0 {
            let t = classify_tier(x);
            assert!(usize::from(t) < TIER_COUNT);
            assert!(t >= prev, "tier dropped at {x}");
            assert!(t - prev <= 1, "tier skipped at {x}");
            prev = t;
            x += 1_250.0;
        }
        assert_eq!(prev, 4);
    }

    #[test]
    fn test_tier_label() {
        assert_eq!(tier_label(3), "Tier 3");
    }
}
