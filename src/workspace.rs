//! Current working state of the calculator.
//!
//! Everything derived (price, delta, targets, payoff series) is recomputed
//! on demand from these inputs and never stored. Mutations that move spot or
//! symbol re-run the strike-ladder reconciliation.

use crate::pricing::payoff::PayoffPoint;
use crate::pricing::risk::{self, RiskTarget};
use crate::pricing::{self, engine, ladder, payoff, OptionType, PricingInputs, PricingResult};
use crate::store::presets::{Preset, PresetPatch, SystemPreset, LAST_SESSION_NAME};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// Stepper bounds for the rupee targets.
const TARGET_MAX: f64 = 1_000_000.0;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub symbol: String,
    #[serde(rename = "S")]
    pub spot: f64,
    #[serde(rename = "K")]
    pub strike: f64,
    pub expiry: NaiveDate,
    #[serde(rename = "r")]
    pub rate: f64,
    #[serde(rename = "q")]
    pub dividend_yield: f64,
    pub sigma: f64,
    #[serde(rename = "selectedType")]
    pub option_type: OptionType,
    pub market_premium: f64,
    pub lot_size: f64,
    pub tp_rupees: f64,
    pub sl_rupees: f64,
    pub tp_step: f64,
    pub sl_step: f64,
    pub premium_step: f64,
    pub show_all_strikes: bool,
    pub strikes: Vec<f64>,
}

/// Everything the view renders from one recomputation pass.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Derived {
    pub theoretical_price: f64,
    pub delta: f64,
    pub days_to_expiry: f64,
    pub take_profit: RiskTarget,
    pub stop_loss: RiskTarget,
    /// The targets are delta-only projections; see the risk module.
    pub risk_note: &'static str,
    pub payoff: Vec<PayoffPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustField {
    Tp,
    Sl,
    Premium,
}

impl Workspace {
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut ws = Self {
            symbol: "BANKNIFTY".into(),
            spot: 58_123.45,
            strike: 58_200.0,
            expiry: now
                .checked_add_days(Days::new(7))
                .unwrap_or(now)
                .date_naive(),
            rate: 0.06,
            dividend_yield: 0.0,
            sigma: 0.25,
            option_type: OptionType::Call,
            market_premium: 120.0,
            lot_size: 25.0,
            tp_rupees: 1_000.0,
            sl_rupees: 500.0,
            tp_step: 100.0,
            sl_step: 100.0,
            premium_step: 5.0,
            show_all_strikes: false,
            strikes: Vec::new(),
        };
        ws.sync_strikes();
        ws
    }

    fn expiry_instant(&self) -> DateTime<Utc> {
        self.expiry.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn pricing_inputs(&self, now: DateTime<Utc>) -> PricingInputs {
        PricingInputs {
            spot: self.spot,
            strike: self.strike,
            rate: self.rate,
            dividend_yield: self.dividend_yield,
            sigma: self.sigma,
            years: pricing::years_to_expiry(self.expiry_instant(), now),
            option_type: self.option_type,
        }
    }

    /// One full derivation pass. Pure with respect to the workspace.
    pub fn derived(&self, now: DateTime<Utc>) -> Derived {
        let inputs = self.pricing_inputs(now);
        let PricingResult { theoretical_price, delta } = engine::evaluate(&inputs);

        // stop-loss target enters as its negative
        let take_profit = risk::target_spot(delta, self.lot_size, self.tp_rupees, self.spot);
        let stop_loss = risk::target_spot(delta, self.lot_size, -self.sl_rupees, self.spot);

        Derived {
            theoretical_price,
            delta,
            days_to_expiry: pricing::days_to_expiry(self.expiry_instant(), now),
            take_profit,
            stop_loss,
            risk_note: "first-order delta approximation; ignores gamma, valid for small moves",
            payoff: payoff::sample(self.spot, self.strike, self.option_type, self.market_premium),
        }
    }

    /// Regenerate the ladder and snap the selected strike, unless the user
    /// opted into show-all mode (ladder externally managed).
    pub fn sync_strikes(&mut self) {
        if let Some(sync) = ladder::sync(self.spot, &self.symbol, self.show_all_strikes, self.strike) {
            self.strikes = sync.strikes;
            self.strike = sync.selected;
        }
    }

    /// Field-wise merge: fields absent from the patch keep their current
    /// value. Ends with a ladder re-sync.
    pub fn apply(&mut self, patch: &PresetPatch) {
        if let Some(v) = &patch.symbol {
            self.symbol = v.clone();
        }
        if let Some(v) = patch.spot {
            self.spot = v;
        }
        if let Some(v) = patch.strike {
            self.strike = v;
        }
        if let Some(raw) = &patch.expiry {
            if let Ok(date) = NaiveDate::parse_from_str(&raw.chars().take(10).collect::<String>(), "%Y-%m-%d") {
                self.expiry = date;
            }
        }
        if let Some(v) = patch.rate {
            self.rate = v;
        }
        if let Some(v) = patch.dividend_yield {
            self.dividend_yield = v;
        }
        if let Some(v) = patch.sigma {
            self.sigma = v;
        }
        if let Some(v) = patch.option_type {
            self.option_type = v;
        }
        if let Some(v) = patch.market_premium {
            self.market_premium = v;
        }
        if let Some(v) = patch.lot_size {
            self.lot_size = v.round().max(1.0);
        }
        if let Some(v) = patch.tp_rupees {
            self.tp_rupees = v.round().max(0.0);
        }
        if let Some(v) = patch.sl_rupees {
            self.sl_rupees = v.round().max(0.0);
        }
        if let Some(v) = patch.tp_step {
            self.tp_step = v;
        }
        if let Some(v) = patch.sl_step {
            self.sl_step = v;
        }
        if let Some(v) = patch.premium_step {
            self.premium_step = v;
        }
        if let Some(v) = patch.show_all_strikes {
            self.show_all_strikes = v;
        }
        self.sync_strikes();
    }

    /// Stepper arithmetic: rupee targets snap to 10-rupee multiples inside
    /// [0, 1_000_000]; the premium rounds to paise.
    pub fn adjust(&mut self, field: AdjustField, direction: f64, step_override: Option<f64>) {
        let step = step_override.unwrap_or(match field {
            AdjustField::Tp => self.tp_step,
            AdjustField::Sl => self.sl_step,
            AdjustField::Premium => self.premium_step,
        });
        let delta = direction * step;
        match field {
            AdjustField::Tp => {
                self.tp_rupees = (((self.tp_rupees + delta) / 10.0).round() * 10.0).clamp(0.0, TARGET_MAX);
            }
            AdjustField::Sl => {
                self.sl_rupees = (((self.sl_rupees + delta) / 10.0).round() * 10.0).clamp(0.0, TARGET_MAX);
            }
            AdjustField::Premium => {
                self.market_premium = ((self.market_premium + delta) * 100.0).round() / 100.0;
            }
        }
    }

    fn snapshot(&self, id: i64, name: String) -> Preset {
        Preset {
            id,
            name,
            symbol: self.symbol.clone(),
            spot: self.spot,
            strike: self.strike,
            expiry: self.expiry_instant().to_rfc3339(),
            rate: self.rate,
            dividend_yield: self.dividend_yield,
            sigma: self.sigma,
            option_type: self.option_type,
            market_premium: self.market_premium,
            lot_size: self.lot_size,
            tp_rupees: self.tp_rupees,
            sl_rupees: self.sl_rupees,
            tp_step: self.tp_step,
            sl_step: self.sl_step,
            premium_step: self.premium_step,
            show_all_strikes: None,
        }
    }

    /// A user-named preset. Empty names get a timestamped placeholder.
    pub fn preset_snapshot(&self, id: i64, name: &str, now: DateTime<Utc>) -> Preset {
        let name = if name.trim().is_empty() {
            format!("Preset {}", now.format("%Y-%m-%d %H:%M:%S"))
        } else {
            name.trim().to_string()
        };
        self.snapshot(id, name)
    }

    /// The session singleton, including the show-all flag.
    pub fn session_snapshot(&self, id: i64) -> Preset {
        let mut p = self.snapshot(id, LAST_SESSION_NAME.into());
        p.show_all_strikes = Some(self.show_all_strikes);
        p
    }

    /// Editable copy of a built-in market preset, seeded from the current
    /// workspace with the market's lot size and step conventions.
    pub fn system_copy(&self, sys: &SystemPreset, id: i64) -> Preset {
        let mut p = self.snapshot(id, format!("{} (editable)", sys.name));
        p.symbol = sys.symbol.into();
        p.lot_size = sys.lot_size;
        p.tp_step = sys.step;
        p.sl_step = sys.step;
        p.premium_step = 5.0;
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_new_workspace_has_synced_ladder() {
        let ws = Workspace::new(now());
        assert_eq!(ws.strikes.len(), 50);
        assert!(ws.strikes.contains(&ws.strike));
    }

    #[test]
    fn test_derived_day_count() {
        let ws = Workspace::new(now());
        let d = ws.derived(now());
        // expiry sits at midnight seven days out; 10:00 start rounds to 7
        assert_eq!(d.days_to_expiry, 7.0);
        assert!(d.theoretical_price > 0.0);
        assert_eq!(d.payoff.len(), 61);
    }

    #[test]
    fn test_apply_partial_patch_keeps_rest() {
        let mut ws = Workspace::new(now());
        let before_sigma = ws.sigma;
        let patch = PresetPatch {
            spot: Some(60_000.0),
            ..PresetPatch::default()
        };
        ws.apply(&patch);
        assert_eq!(ws.spot, 60_000.0);
        assert_eq!(ws.sigma, before_sigma);
        // ladder followed the spot; old strike snapped to the nearest member
        assert!(ws.strikes.contains(&ws.strike));
        assert_eq!(ws.strike, *ws.strikes.first().unwrap());
    }

    #[test]
    fn test_apply_clamps_lot_and_targets() {
        let mut ws = Workspace::new(now());
        let patch = PresetPatch {
            lot_size: Some(0.2),
            tp_rupees: Some(-50.0),
            ..PresetPatch::default()
        };
        ws.apply(&patch);
        assert_eq!(ws.lot_size, 1.0);
        assert_eq!(ws.tp_rupees, 0.0);
    }

    #[test]
    fn test_apply_symbol_change_rebuilds_ladder_step() {
        let mut ws = Workspace::new(now());
        let patch = PresetPatch {
            symbol: Some("SENSEX".into()),
            spot: Some(81_000.0),
            ..PresetPatch::default()
        };
        ws.apply(&patch);
        assert_eq!(ws.strikes[1] - ws.strikes[0], 100.0);
    }

    #[test]
    fn test_show_all_suppresses_regeneration() {
        let mut ws = Workspace::new(now());
        let frozen = ws.strikes.clone();
        ws.show_all_strikes = true;
        let patch = PresetPatch {
            spot: Some(99_999.0),
            strike: Some(12_345.0),
            ..PresetPatch::default()
        };
        ws.apply(&patch);
        assert_eq!(ws.strikes, frozen);
        assert_eq!(ws.strike, 12_345.0, "no snapping in show-all mode");
    }

    #[test]
    fn test_adjust_targets_snap_to_tens() {
        let mut ws = Workspace::new(now());
        ws.tp_rupees = 1_004.0;
        ws.adjust(AdjustField::Tp, 1.0, Some(3.0));
        assert_eq!(ws.tp_rupees, 1_010.0);
        ws.adjust(AdjustField::Sl, -1.0, Some(10_000.0));
        assert_eq!(ws.sl_rupees, 0.0, "clamped at zero");
    }

    #[test]
    fn test_adjust_premium_rounds_to_paise() {
        let mut ws = Workspace::new(now());
        ws.market_premium = 120.0;
        ws.adjust(AdjustField::Premium, 1.0, Some(0.333));
        assert_eq!(ws.market_premium, 120.33);
    }

    #[test]
    fn test_adjust_uses_configured_step() {
        let mut ws = Workspace::new(now());
        ws.tp_rupees = 1_000.0;
        ws.tp_step = 250.0;
        ws.adjust(AdjustField::Tp, 1.0, None);
        assert_eq!(ws.tp_rupees, 1_250.0);
    }

    #[test]
    fn test_session_snapshot_roundtrip() {
        let mut ws = Workspace::new(now());
        ws.sigma = 0.31;
        ws.show_all_strikes = true;
        let snap = ws.session_snapshot(7);
        assert_eq!(snap.name, LAST_SESSION_NAME);
        assert_eq!(snap.show_all_strikes, Some(true));

        let mut other = Workspace::new(now());
        other.apply(&PresetPatch::from(&snap));
        assert_eq!(other.sigma, 0.31);
        assert_eq!(other.expiry, ws.expiry);
        assert!(other.show_all_strikes);
    }

    #[test]
    fn test_preset_snapshot_default_name() {
        let ws = Workspace::new(now());
        let p = ws.preset_snapshot(1, "   ", now());
        assert!(p.name.starts_with("Preset 2026-08-05"));
        assert_eq!(p.show_all_strikes, None);
    }

    #[test]
    fn test_system_copy() {
        let ws = Workspace::new(now());
        let sys = crate::store::presets::system_preset("Nifty50").unwrap();
        let p = ws.system_copy(sys, 3);
        assert_eq!(p.name, "Nifty50 (editable)");
        assert_eq!(p.symbol, "NIFTY");
        assert_eq!(p.lot_size, 75.0);
        assert_eq!(p.tp_step, 50.0);
        assert_eq!(p.sigma, ws.sigma);
    }
}
