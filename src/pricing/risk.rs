//! Delta-based profit/loss spot targets.
//!
//! Linear (delta-only) projection: the implied move ignores gamma and is
//! only meaningful for small displacements. Callers supply stop-loss targets
//! as negative rupee amounts.

/// Guard against division blow-up near zero delta.
const MIN_ABS_DELTA: f64 = 1e-6;

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RiskTarget {
    /// Target premium change per option (target / lot size).
    pub per_option: f64,
    /// First-order spot displacement implying that change.
    pub spot_move: f64,
    /// Current spot plus the implied move.
    pub implied_spot: f64,
}

/// Translate a rupee target into the spot level implying it, via delta.
/// Zero-adjacent deltas are substituted with a signed epsilon, defaulting to
/// positive when delta is exactly zero.
pub fn target_spot(delta: f64, lot_size: f64, target_rupees: f64, spot: f64) -> RiskTarget {
    let per_option = target_rupees / lot_size;
    let safe_delta = if delta.abs() < MIN_ABS_DELTA {
        let sign = if delta == 0.0 { 1.0 } else { delta.signum() };
        sign * MIN_ABS_DELTA
    } else {
        delta
    };
    let spot_move = per_option / safe_delta;
    RiskTarget {
        per_option,
        spot_move,
        implied_spot: spot + spot_move,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_target_above_spot_for_long_call() {
        let t = target_spot(0.5, 25.0, 1000.0, 58_000.0);
        assert_eq!(t.per_option, 40.0);
        assert_eq!(t.spot_move, 80.0);
        assert_eq!(t.implied_spot, 58_080.0);
    }

    #[test]
    fn test_stop_target_below_spot_for_long_call() {
        let t = target_spot(0.5, 25.0, -500.0, 58_000.0);
        assert!(t.spot_move < 0.0);
        assert_eq!(t.implied_spot, 58_000.0 - 40.0);
    }

    #[test]
    fn test_negative_delta_flips_direction() {
        // long put: profit needs the spot to fall
        let t = target_spot(-0.4, 25.0, 1000.0, 58_000.0);
        assert!(t.implied_spot < 58_000.0);
    }

    #[test]
    fn test_zero_delta_uses_positive_epsilon() {
        let t = target_spot(0.0, 25.0, 1000.0, 58_000.0);
        assert!(t.spot_move > 0.0);
        assert!(t.spot_move.is_finite());
    }

    #[test]
    fn test_tiny_negative_delta_keeps_sign() {
        let t = target_spot(-1e-9, 25.0, 1000.0, 58_000.0);
        assert!(t.spot_move < 0.0);
        assert!(t.spot_move.is_finite());
    }
}
