pub mod engine;
pub mod ladder;
pub mod normal;
pub mod payoff;
pub mod risk;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff if exercised immediately, ignoring time value.
    #[inline]
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// Inputs to the pricing engine. Callers may hand over anything; non-finite
/// fields are coerced to 0.0 before computation rather than rejected.
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs {
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub sigma: f64,
    pub years: f64,
    pub option_type: OptionType,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PricingResult {
    pub theoretical_price: f64,
    pub delta: f64,
}

/// Coerce an arbitrary caller-supplied value into the finite domain.
#[inline]
pub fn sanitize(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Whole days until expiry, rounded, never negative.
pub fn days_to_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (expiry - now).num_seconds() as f64;
    (secs / 86_400.0).round().max(0.0)
}

/// Year fraction used in pricing, floored at zero.
pub fn years_to_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (days_to_expiry(expiry, now) / 365.0).max(0.0)
}
