//! Black-Scholes pricing and greeks for European options.
//!
//! Everything here is a pure function over `f64` inputs. Degenerate inputs
//! (expired, zero vol, non-positive spot or strike) degrade to intrinsic
//! value / zero greeks rather than returning errors; callers that need to
//! distinguish degenerate cases check the inputs themselves.

use gg_types::OptionRight;
use serde::{Deserialize, Serialize};

// ---------- normal distribution helpers (no external dep) ----------

/// Standard normal cumulative distribution function (Abramowitz & Stegun 26.2.17).
pub fn norm_cdf(x: f64) -> f64 {
    if x >= 8.0 {
        return 1.0;
    }
    if x <= -8.0 {
        return 0.0;
    }

    let a1 = 0.254829592_f64;
    let a2 = -0.284496736_f64;
    let a3 = 1.421413741_f64;
    let a4 = -1.453152027_f64;
    let a5 = 1.061405429_f64;
    let p = 0.3275911_f64;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x_abs = x.abs();
    let t = 1.0 / (1.0 + p * x_abs);
    let y =
        1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x_abs * x_abs / 2.0).exp();

    0.5 * (1.0 + sign * y)
}

/// Standard normal probability density function.
pub fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

// ---------- Black-Scholes core ----------

/// Compute d1 and d2.
pub fn d1_d2(s: f64, k: f64, r: f64, q: f64, sigma: f64, t: f64) -> (f64, f64) {
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();
    (d1, d2)
}

fn intrinsic(right: OptionRight, s: f64, k: f64) -> f64 {
    match right {
        OptionRight::Call => (s - k).max(0.0),
        OptionRight::Put => (k - s).max(0.0),
    }
}

/// Price a European option using the Black-Scholes model.
///
/// Expired options (`t <= 0`) price at intrinsic value. Zero or negative vol,
/// spot, or strike also collapse to intrinsic.
pub fn price(right: OptionRight, s: f64, k: f64, t: f64, r: f64, q: f64, sigma: f64) -> f64 {
    if t <= 0.0 || sigma <= 0.0 || s <= 0.0 || k <= 0.0 {
        return intrinsic(right, s, k);
    }

    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    let disc = (-r * t).exp();
    let div_disc = (-q * t).exp();

    let raw = match right {
        OptionRight::Call => s * div_disc * norm_cdf(d1) - k * disc * norm_cdf(d2),
        OptionRight::Put => k * disc * norm_cdf(-d2) - s * div_disc * norm_cdf(-d1),
    };
    raw.max(0.0)
}

/// Per-contract greeks in trader units: theta per calendar day, vega per
/// one vol point, rho per one rate point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl Greeks {
    pub fn zero() -> Self {
        Self {
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            rho: 0.0,
        }
    }
}

/// Closed-form Black-Scholes greeks.
///
/// Returns [`Greeks::zero`] on any degenerate input rather than NaN.
pub fn greeks(right: OptionRight, s: f64, k: f64, t: f64, r: f64, q: f64, sigma: f64) -> Greeks {
    if t <= 0.0 || sigma <= 0.0 || s <= 0.0 || k <= 0.0 {
        return Greeks::zero();
    }

    let (d1, d2) = d1_d2(s, k, r, q, sigma, t);
    let disc = (-r * t).exp();
    let div_disc = (-q * t).exp();

    let delta = match right {
        OptionRight::Call => div_disc * norm_cdf(d1),
        OptionRight::Put => -div_disc * norm_cdf(-d1),
    };

    let gamma = div_disc * norm_pdf(d1) / (s * sigma * t.sqrt());

    let theta_common = -(s * div_disc * norm_pdf(d1) * sigma) / (2.0 * t.sqrt());
    let theta = match right {
        OptionRight::Call => {
            theta_common - r * k * disc * norm_cdf(d2) + q * s * div_disc * norm_cdf(d1)
        }
        OptionRight::Put => {
            theta_common + r * k * disc * norm_cdf(-d2) - q * s * div_disc * norm_cdf(-d1)
        }
    };

    let vega = s * div_disc * norm_pdf(d1) * t.sqrt();

    let rho = match right {
        OptionRight::Call => k * t * disc * norm_cdf(d2),
        OptionRight::Put => -k * t * disc * norm_cdf(-d2),
    };

    Greeks {
        delta,
        gamma,
        // per calendar day
        theta: theta / 365.0,
        // per 1 % vol move
        vega: vega / 100.0,
        // per 1 % rate move
        rho: rho / 100.0,
    }
}

/// Unscaled vega (per unit of vol, not per vol point). The implied-vol
/// solver needs this magnitude for its Newton step.
pub fn vega_raw(s: f64, k: f64, t: f64, r: f64, q: f64, sigma: f64) -> f64 {
    if t <= 0.0 || sigma <= 0.0 || s <= 0.0 || k <= 0.0 {
        return 0.0;
    }
    let (d1, _) = d1_d2(s, k, r, q, sigma, t);
    s * (-q * t).exp() * norm_pdf(d1) * t.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf_boundaries() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!(norm_cdf(8.0) == 1.0);
        assert!(norm_cdf(-8.0) == 0.0);
    }

    #[test]
    fn test_call_price_sanity() {
        let p = price(OptionRight::Call, 155.0, 150.0, 0.25, 0.05, 0.0, 0.25);
        // ITM call should be worth at least intrinsic ($5)
        assert!(p > 5.0, "call price = {p}");
        assert!(p < 20.0, "call price unreasonably high = {p}");
    }

    #[test]
    fn test_put_price_sanity() {
        let p = price(OptionRight::Put, 145.0, 150.0, 0.25, 0.05, 0.0, 0.25);
        assert!(p > 5.0, "put price = {p}");
        assert!(p < 20.0, "put price unreasonably high = {p}");
    }

    #[test]
    fn test_put_call_parity() {
        let (s, k, t, r) = (150.0, 150.0, 0.5, 0.05);
        let c = price(OptionRight::Call, s, k, t, r, 0.0, 0.30);
        let p = price(OptionRight::Put, s, k, t, r, 0.0, 0.30);
        // C - P = S - K*exp(-rT)
        let lhs = c - p;
        let rhs = s - k * (-r * t).exp();
        assert!(
            (lhs - rhs).abs() < 0.01,
            "put-call parity violated: lhs={lhs}, rhs={rhs}"
        );
    }

    #[test]
    fn test_expired_option_returns_intrinsic() {
        let p = price(OptionRight::Call, 160.0, 150.0, 0.0, 0.05, 0.0, 0.25);
        assert!((p - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_greeks_sign_call() {
        let g = greeks(OptionRight::Call, 150.0, 150.0, 0.25, 0.05, 0.0, 0.25);
        assert!(g.delta > 0.0, "call delta should be positive");
        assert!(g.gamma > 0.0, "gamma should be positive");
        assert!(g.theta < 0.0, "theta should be negative (time decay)");
        assert!(g.vega > 0.0, "vega should be positive");
        assert!(g.rho > 0.0, "call rho should be positive");
    }

    #[test]
    fn test_greeks_sign_put() {
        let g = greeks(OptionRight::Put, 150.0, 150.0, 0.25, 0.05, 0.0, 0.25);
        assert!(g.delta < 0.0, "put delta should be negative");
        assert!(g.gamma > 0.0, "gamma should be positive");
        assert!(g.vega > 0.0, "vega should be positive");
        assert!(g.rho < 0.0, "put rho should be negative");
    }

    #[test]
    fn test_gamma_vega_call_put_equality() {
        let c = greeks(OptionRight::Call, 350.0, 352.0, 1.0 / 365.0, 0.05, 0.0, 0.40);
        let p = greeks(OptionRight::Put, 350.0, 352.0, 1.0 / 365.0, 0.05, 0.0, 0.40);
        assert!((c.gamma - p.gamma).abs() < 1e-12);
        assert!((c.vega - p.vega).abs() < 1e-12);
    }

    #[test]
    fn test_delta_put_call_parity() {
        // call delta - put delta = e^(-qT)
        let q = 0.01;
        let t = 0.1;
        let c = greeks(OptionRight::Call, 100.0, 105.0, t, 0.05, q, 0.30);
        let p = greeks(OptionRight::Put, 100.0, 105.0, t, 0.05, q, 0.30);
        assert!((c.delta - p.delta - (-q * t).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_deep_itm_delta_near_one() {
        let g = greeks(OptionRight::Call, 400.0, 350.0, 1.0 / 365.0, 0.05, 0.0, 0.30);
        assert!(g.delta > 0.9, "deep ITM call delta = {}", g.delta);
    }

    #[test]
    fn test_deep_otm_delta_small() {
        let g = greeks(OptionRight::Call, 350.0, 400.0, 0.25, 0.05, 0.0, 0.25);
        assert!(
            g.delta > 0.0 && g.delta < 0.2,
            "deep OTM call delta = {}",
            g.delta
        );
        // One-day OTM at a strike where d1 stays inside the cdf's ±8 cutoff;
        // far deeper strikes collapse to exactly 0.
        let g = greeks(OptionRight::Call, 350.0, 360.0, 1.0 / 365.0, 0.05, 0.0, 0.25);
        assert!(
            g.delta > 0.0 && g.delta < 0.2,
            "1-day OTM call delta = {}",
            g.delta
        );
    }

    #[test]
    fn test_atm_one_day_delta_range() {
        let g = greeks(OptionRight::Call, 350.0, 350.0, 1.0 / 365.0, 0.05, 0.0, 0.30);
        assert!(
            g.delta > 0.3 && g.delta < 0.7,
            "ATM 1-day call delta = {}",
            g.delta
        );
    }

    #[test]
    fn test_degenerate_inputs_zero_greeks() {
        assert_eq!(
            greeks(OptionRight::Call, 100.0, 100.0, 0.0, 0.05, 0.0, 0.25),
            Greeks::zero()
        );
        assert_eq!(
            greeks(OptionRight::Call, 100.0, 100.0, 0.1, 0.05, 0.0, 0.0),
            Greeks::zero()
        );
        assert_eq!(
            greeks(OptionRight::Put, 0.0, 100.0, 0.1, 0.05, 0.0, 0.25),
            Greeks::zero()
        );
    }
}
