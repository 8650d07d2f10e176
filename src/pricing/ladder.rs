//! Discrete strike grid derived from spot and symbol, and the reconciliation
//! that keeps the selected strike on the grid.

pub const LADDER_SIZE: usize = 50;

/// Strike spacing by market convention: NIFTY-family indices tick in 50s,
/// everything else in 100s. Matching is case-insensitive on the substring.
pub fn step_for_symbol(symbol: &str) -> f64 {
    if symbol.to_uppercase().contains("NIFTY") {
        50.0
    } else {
        100.0
    }
}

/// Fifty ascending strikes centered on the spot rounded to the step grid.
pub fn build(spot: f64, symbol: &str) -> Vec<f64> {
    let step = step_for_symbol(symbol);
    let base = (spot / step).round() * step;
    let mut strikes: Vec<f64> = (0..LADDER_SIZE)
        .map(|i| base + (i as f64 - 25.0) * step)
        .collect();
    strikes.sort_by(|a, b| a.total_cmp(b));
    strikes
}

/// Ladder entry nearest to `strike`. The fold starts from the middle entry
/// and replaces only on strictly smaller distance, so an exact tie keeps the
/// earlier (lower) strike.
pub fn nearest(strikes: &[f64], strike: f64) -> f64 {
    let start = strikes[strikes.len() / 2];
    strikes.iter().fold(start, |prev, &cur| {
        if (cur - strike).abs() < (prev - strike).abs() {
            cur
        } else {
            prev
        }
    })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LadderSync {
    pub strikes: Vec<f64>,
    pub selected: f64,
}

/// Regenerate the ladder for (spot, symbol) and snap the current strike to
/// its nearest member. Returns None in show-all mode, where the ladder is
/// externally managed and no regeneration or snapping occurs.
///
/// The snap silently discards an off-ladder strike whenever spot or symbol
/// moves. That mirrors the product's long-standing behavior; see DESIGN.md
/// before changing it.
pub fn sync(spot: f64, symbol: &str, show_all: bool, current_strike: f64) -> Option<LadderSync> {
    if show_all {
        return None;
    }
    let strikes = build(spot, symbol);
    let selected = nearest(&strikes, current_strike);
    Some(LadderSync { strikes, selected })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifty_sorted_evenly_spaced() {
        let strikes = build(58_123.45, "BANKNIFTY");
        assert_eq!(strikes.len(), 50);
        let step = step_for_symbol("BANKNIFTY");
        for w in strikes.windows(2) {
            assert_eq!(w[1] - w[0], step);
        }
    }

    #[test]
    fn test_step_by_symbol() {
        assert_eq!(step_for_symbol("NIFTY"), 50.0);
        assert_eq!(step_for_symbol("BANKNIFTY"), 50.0);
        assert_eq!(step_for_symbol("FinNifty"), 50.0);
        assert_eq!(step_for_symbol("SENSEX"), 100.0);
    }

    #[test]
    fn test_centered_on_rounded_base() {
        // base = round(20049 / 50) * 50 = 20050
        let strikes = build(20_049.0, "NIFTY");
        assert_eq!(strikes[0], 20_050.0 - 25.0 * 50.0);
        assert_eq!(strikes[49], 20_050.0 + 24.0 * 50.0);
        assert!(strikes.contains(&20_050.0));
    }

    #[test]
    fn test_nearest_snaps_off_ladder_strike() {
        let strikes = build(58_123.45, "SENSEX");
        let snapped = nearest(&strikes, 58_123.0);
        assert!(strikes.contains(&snapped));
        assert_eq!(snapped, 58_100.0);
    }

    #[test]
    fn test_nearest_tie_prefers_lower() {
        let strikes = build(1_000.0, "SENSEX");
        // exactly halfway between 1000 and 1100
        assert_eq!(nearest(&strikes, 1_050.0), 1_000.0);
    }

    #[test]
    fn test_sync_show_all_regenerates_nothing() {
        assert!(sync(58_123.45, "BANKNIFTY", true, 12_345.0).is_none());
    }

    #[test]
    fn test_sync_selection_is_ladder_member() {
        let s = sync(58_123.45, "BANKNIFTY", false, 57_777.0).unwrap();
        assert_eq!(s.strikes.len(), 50);
        assert!(s.strikes.contains(&s.selected));
    }
}
