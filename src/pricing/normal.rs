//! Standard normal density and cumulative distribution.
//!
//! The CDF is the Zelen-Severo rational approximation (Abramowitz & Stegun
//! 26.2.17). The coefficients are load-bearing: downstream numerical
//! compatibility tests pin prices to this exact polynomial, so a library CDF
//! is deliberately not substituted here.

use std::f64::consts::PI;

const K0: f64 = 0.2316419;
const A1: f64 = 0.31938153;
const A2: f64 = -0.356563782;
const A3: f64 = 1.781477937;
const A4: f64 = -1.821255978;
const A5: f64 = 1.330274429;

/// Standard normal density. Non-finite input collapses to x = 0.
#[inline]
pub fn density(x: f64) -> f64 {
    let x = if x.is_finite() { x } else { 0.0 };
    (-x * x / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF. Total over all reals: non-finite input yields 0.5
/// (maximal uncertainty), and |x| > 8 saturates to 0/1 where the polynomial
/// approximation becomes unstable.
pub fn cumulative(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.5;
    }
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let a = x.abs();
    if a > 8.0 {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    let k = 1.0 / (1.0 + K0 * a);
    let poly = 1.0 - density(a) * (A1 * k + A2 * k.powi(2) + A3 * k.powi(3) + A4 * k.powi(4) + A5 * k.powi(5));
    if sign >= 0.0 {
        poly
    } else {
        1.0 - poly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{ContinuousCDF, Normal};

    #[test]
    fn test_known_values() {
        assert_eq!(cumulative(0.0), 0.5);
        assert!((cumulative(1.0) - 0.8413).abs() < 5e-5, "got {}", cumulative(1.0));
        assert!((cumulative(-1.0) - 0.1587).abs() < 5e-5, "got {}", cumulative(-1.0));
        assert_eq!(cumulative(10.0), 1.0);
        assert_eq!(cumulative(-10.0), 0.0);
    }

    #[test]
    fn test_non_finite_is_half() {
        assert_eq!(cumulative(f64::NAN), 0.5);
        assert_eq!(cumulative(f64::INFINITY), 0.5);
        assert_eq!(cumulative(f64::NEG_INFINITY), 0.5);
    }

    #[test]
    fn test_density_at_zero() {
        assert!((density(0.0) - 0.3989422804).abs() < 1e-9);
        // non-finite collapses to the x = 0 value
        assert_eq!(density(f64::NAN), density(0.0));
    }

    #[test]
    fn test_complement_symmetry() {
        for x in [-3.0, -1.5, -0.2, 0.7, 2.4] {
            let s = cumulative(x) + cumulative(-x);
            assert!((s - 1.0).abs() < 1e-12, "x={x} sum={s}");
        }
    }

    #[test]
    fn test_matches_reference_cdf() {
        let reference = Normal::new(0.0, 1.0).unwrap();
        let mut x = -6.0;
        while x <= 6.0 {
            let got = cumulative(x);
            let want = reference.cdf(x);
            assert!((got - want).abs() < 1e-6, "x={x} got={got} want={want}");
            x += 0.25;
        }
    }
}
