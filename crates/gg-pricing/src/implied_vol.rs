//! Newton-Raphson implied volatility tuned for same-day expiries.

use std::collections::HashMap;

use gg_types::OptionRight;
use tracing::debug;

use crate::black_scholes::{price, vega_raw};

/// Threshold below which an expiry counts as same-day for solver purposes.
const SAME_DAY_T: f64 = 1.0 / 365.0;

/// Solver tuning knobs.
#[derive(Debug, Clone)]
pub struct IvSolverConfig {
    pub max_iterations: u32,
    /// Tighter bound for same-day expiries, where latency matters more than
    /// the last decimal of vol.
    pub same_day_max_iterations: u32,
    pub price_tolerance: f64,
    /// Raw vega below this triggers the finite-difference fallback.
    pub vega_floor: f64,
    pub sigma_min: f64,
    pub sigma_max: f64,
    pub default_sigma: f64,
    pub same_day_default_sigma: f64,
}

impl Default for IvSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            same_day_max_iterations: 20,
            price_tolerance: 1e-6,
            vega_floor: 1e-8,
            sigma_min: 0.005,
            sigma_max: 10.0,
            default_sigma: 0.30,
            same_day_default_sigma: 0.50,
        }
    }
}

/// Newton-Raphson implied-volatility solver.
///
/// Keeps a per-underlying cache of the last successfully solved vol, used to
/// seed same-day solves where the surface moves fast but stays continuous.
#[derive(Debug, Default)]
pub struct IvSolver {
    config: IvSolverConfig,
    last_solved: HashMap<String, f64>,
}

impl IvSolver {
    pub fn new(config: IvSolverConfig) -> Self {
        Self {
            config,
            last_solved: HashMap::new(),
        }
    }

    /// Last successfully solved vol for an underlying, if any.
    pub fn cached_vol(&self, underlying: &str) -> Option<f64> {
        self.last_solved.get(underlying).copied()
    }

    pub fn clear_cache(&mut self) {
        self.last_solved.clear();
    }

    /// Solve for the implied volatility of `market_price`.
    ///
    /// Never fails: degenerate inputs and non-convergent solves fall back to
    /// the expiry-class default vol. A converged value outside
    /// `[sigma_min, sigma_max]` also yields the default rather than a clamped
    /// value, so a nonsense quote cannot masquerade as a plausible extreme.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        underlying: &str,
        right: OptionRight,
        market_price: f64,
        s: f64,
        k: f64,
        t: f64,
        r: f64,
        q: f64,
    ) -> f64 {
        let cfg = &self.config;
        let same_day = t < SAME_DAY_T;
        let fallback = if same_day {
            cfg.same_day_default_sigma
        } else {
            cfg.default_sigma
        };

        if t <= 0.0 || market_price <= 0.0 || s <= 0.0 || k <= 0.0 {
            return fallback;
        }

        // Same-day solves seed from the last vol seen on this underlying.
        let mut sigma = if same_day {
            self.last_solved
                .get(underlying)
                .copied()
                .unwrap_or(cfg.same_day_default_sigma)
        } else {
            cfg.default_sigma
        };

        let max_iter = if same_day {
            cfg.same_day_max_iterations
        } else {
            cfg.max_iterations
        };

        let mut converged = false;
        for _ in 0..max_iter {
            let model = price(right, s, k, t, r, q, sigma);
            let diff = model - market_price;
            if diff.abs() < cfg.price_tolerance {
                converged = true;
                break;
            }

            let mut vega = vega_raw(s, k, t, r, q, sigma);
            if vega.abs() < cfg.vega_floor {
                // Flat analytic vega near expiry; estimate the slope by
                // repricing one basis point either side.
                let bump = 1e-4;
                let up = price(right, s, k, t, r, q, sigma + bump);
                let down = price(right, s, k, t, r, q, (sigma - bump).max(1e-6));
                vega = (up - down) / (2.0 * bump);
                if vega.abs() < cfg.vega_floor {
                    debug!(underlying, sigma, "implied vol: vega collapsed, giving up");
                    break;
                }
            }

            sigma -= diff / vega;
            if sigma <= 0.0 {
                sigma = 1e-3;
            }
        }

        if !converged || sigma < cfg.sigma_min || sigma > cfg.sigma_max {
            debug!(
                underlying,
                sigma, converged, "implied vol out of band, using default"
            );
            return fallback;
        }

        self.last_solved.insert(underlying.to_string(), sigma);
        sigma
    }
}
