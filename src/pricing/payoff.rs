//! Expiry payoff sampling for the chart series.

use super::OptionType;

/// Sample count is fixed; the series always has STEPS + 1 points.
const STEPS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PayoffPoint {
    pub spot: f64,
    pub profit: f64,
}

/// Expiry profit curve around the current spot. Deterministic and fully
/// materialized -- the renderer needs min/max over the whole series for
/// scaling.
pub fn sample(spot: f64, strike: f64, option_type: OptionType, market_premium: f64) -> Vec<PayoffPoint> {
    let range = 400.0_f64.max((0.05 * spot).round());
    let lower = (spot - range).floor();
    let upper = (spot + range).ceil();
    let step_size = (upper - lower) / STEPS as f64;

    (0..=STEPS)
        .map(|i| {
            let s = (lower + i as f64 * step_size).round();
            PayoffPoint {
                spot: s,
                profit: option_type.intrinsic(s, strike) - market_premium,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_61_points() {
        for s in [100.0, 8_000.0, 58_123.45] {
            assert_eq!(sample(s, s, OptionType::Call, 0.0).len(), 61);
        }
    }

    #[test]
    fn test_spots_non_decreasing_and_bracket_spot() {
        let s: f64 = 58_123.45;
        let range = (0.05 * s).round().max(400.0);
        let series = sample(s, 58_200.0, OptionType::Call, 120.0);
        for w in series.windows(2) {
            assert!(w[1].spot >= w[0].spot);
        }
        assert!(series.first().unwrap().spot <= s - range);
        assert!(series.last().unwrap().spot >= s + range);
    }

    #[test]
    fn test_profit_is_intrinsic_minus_premium() {
        let series = sample(1000.0, 1000.0, OptionType::Call, 50.0);
        for p in &series {
            let intrinsic = (p.spot - 1000.0).max(0.0);
            assert_eq!(p.profit, intrinsic - 50.0);
        }
        // deep OTM side: flat loss of the premium
        assert_eq!(series.first().unwrap().profit, -50.0);
    }

    #[test]
    fn test_put_side_mirrors() {
        let series = sample(1000.0, 1000.0, OptionType::Put, 50.0);
        assert!(series.first().unwrap().profit > 0.0);
        assert_eq!(series.last().unwrap().profit, -50.0);
    }

    #[test]
    fn test_small_spot_uses_minimum_range() {
        let series = sample(100.0, 100.0, OptionType::Call, 0.0);
        assert!(series.first().unwrap().spot <= -300.0);
        assert!(series.last().unwrap().spot >= 500.0);
    }

    #[test]
    fn test_deterministic() {
        let a = sample(58_123.45, 58_200.0, OptionType::Put, 120.0);
        let b = sample(58_123.45, 58_200.0, OptionType::Put, 120.0);
        assert_eq!(a, b);
    }
}
