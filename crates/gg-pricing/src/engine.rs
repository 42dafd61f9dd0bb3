//! Real-time greeks engine specialized for same-day (0DTE) expiries.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use gg_types::{OptionQuote, RiskLevel, UnderlyingQuote};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::black_scholes::{greeks, Greeks};
use crate::implied_vol::{IvSolver, IvSolverConfig};

/// Full per-contract greeks snapshot plus the 0DTE-specific derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeksResult {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub underlying_price: Decimal,
    pub option_price: Decimal,
    pub strike: Decimal,
    /// Annualized.
    pub time_to_expiry: f64,
    pub risk_free_rate: f64,
    pub implied_volatility: f64,
    pub delta: f64,
    pub gamma: f64,
    /// Per calendar day.
    pub theta: f64,
    /// Per 1 vol point.
    pub vega: f64,
    /// Per 1 rate point.
    pub rho: f64,
    /// Theta decay per minute: |theta| / 1440.
    pub time_decay_rate: f64,
    /// Gamma P&L of a 1 % underlying move: 0.5 * gamma * (0.01 * S)^2.
    pub gamma_exposure: f64,
    /// |theta| as a fraction of the option price.
    pub theta_burn_rate: f64,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
}

impl GreeksResult {
    /// All-zero sentinel used for every degenerate computation.
    ///
    /// Downstream risk checks keep running on the last good numbers instead
    /// of stalling on an error, so degeneracy is a value here, not a failure.
    pub fn sentinel(quote: &OptionQuote, underlying: &UnderlyingQuote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            timestamp: Utc::now(),
            underlying_price: underlying.price,
            option_price: quote.price,
            strike: quote.strike,
            time_to_expiry: 0.0,
            risk_free_rate: 0.0,
            implied_volatility: 0.0,
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            rho: 0.0,
            time_decay_rate: 0.0,
            gamma_exposure: 0.0,
            theta_burn_rate: 0.0,
            risk_level: RiskLevel::Unknown,
            risk_score: 0.0,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct GreeksEngineConfig {
    pub risk_free_rate: f64,
    pub dividend_yield: f64,
    /// Local hour of the equity-option close (16 = 4:00 PM).
    pub market_close_hour: u32,
    /// Fixed exchange offset from UTC in hours. Eastern time without DST
    /// handling; a calendar-aware clock is the collaborator's job.
    pub exchange_utc_offset_hours: i32,
    /// Floor for annualized time-to-expiry (one second).
    pub min_time_to_expiry: f64,
    /// Gamma level that maps to the full gamma contribution of the risk score.
    pub reference_gamma: f64,
    pub solver: IvSolverConfig,
}

impl Default for GreeksEngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            dividend_yield: 0.0,
            market_close_hour: 16,
            exchange_utc_offset_hours: -5,
            min_time_to_expiry: 1.0 / (365.0 * 24.0 * 3600.0),
            reference_gamma: 0.05,
            solver: IvSolverConfig::default(),
        }
    }
}

/// Computes greeks for option quotes, caching results per symbol.
///
/// Owns its caches; independent engines never share state.
#[derive(Debug, Default)]
pub struct GreeksEngine {
    config: GreeksEngineConfig,
    solver: IvSolver,
    greeks_cache: HashMap<String, GreeksResult>,
}

impl GreeksEngine {
    pub fn new(config: GreeksEngineConfig) -> Self {
        let solver = IvSolver::new(config.solver.clone());
        Self {
            config,
            solver,
            greeks_cache: HashMap::new(),
        }
    }

    /// Compute the full greeks snapshot for an option quote.
    ///
    /// Degenerate inputs (expired, zero price, unsolvable vol) produce the
    /// sentinel result rather than an error.
    pub fn compute(&mut self, quote: &OptionQuote, underlying: &UnderlyingQuote) -> GreeksResult {
        let s = underlying.price.to_f64().unwrap_or(0.0);
        let k = quote.strike.to_f64().unwrap_or(0.0);
        let option_price = quote.price.to_f64().unwrap_or(0.0);
        let r = self.config.risk_free_rate;
        let q = self.config.dividend_yield;

        let t = self.time_to_expiry(quote);

        if t <= 0.0 || s <= 0.0 || option_price <= 0.0 {
            warn!(
                symbol = %quote.symbol,
                s, t, option_price, "degenerate pricing inputs, emitting sentinel"
            );
            return GreeksResult::sentinel(quote, underlying);
        }

        // Feed greeks are trusted only when at least as fresh as the quote.
        if let Some(fg) = &quote.greeks {
            if fg.computed_at >= quote.timestamp && fg.implied_vol > 0.0 {
                let result = self.assemble(
                    quote,
                    underlying,
                    t,
                    fg.implied_vol,
                    fg.delta,
                    fg.gamma,
                    fg.theta,
                    fg.vega,
                    0.0,
                    option_price,
                    s,
                );
                self.greeks_cache.insert(quote.symbol.clone(), result.clone());
                return result;
            }
            debug!(symbol = %quote.symbol, "stale feed greeks, recomputing");
        }

        let sigma = self.solver.solve(
            &quote.underlying,
            quote.right,
            option_price,
            s,
            k,
            t,
            r,
            q,
        );

        if sigma <= 0.0 {
            return GreeksResult::sentinel(quote, underlying);
        }

        let g = greeks(quote.right, s, k, t, r, q, sigma);
        if g == Greeks::zero() {
            return GreeksResult::sentinel(quote, underlying);
        }

        let result = self.assemble(
            quote,
            underlying,
            t,
            sigma,
            g.delta,
            g.gamma,
            g.theta,
            g.vega,
            g.rho,
            option_price,
            s,
        );
        self.greeks_cache.insert(quote.symbol.clone(), result.clone());
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        quote: &OptionQuote,
        underlying: &UnderlyingQuote,
        t: f64,
        sigma: f64,
        delta: f64,
        gamma: f64,
        theta: f64,
        vega: f64,
        rho: f64,
        option_price: f64,
        s: f64,
    ) -> GreeksResult {
        let time_decay_rate = theta.abs() / (24.0 * 60.0);
        let gamma_exposure = 0.5 * gamma * (0.01 * s).powi(2);
        let theta_burn_rate = if option_price > 0.0 {
            theta.abs() / option_price
        } else {
            0.0
        };

        let risk_score = self.risk_score(delta, gamma, theta_burn_rate, t);
        let risk_level = RiskLevel::from_score(risk_score);

        GreeksResult {
            symbol: quote.symbol.clone(),
            timestamp: Utc::now(),
            underlying_price: underlying.price,
            option_price: quote.price,
            strike: quote.strike,
            time_to_expiry: t,
            risk_free_rate: self.config.risk_free_rate,
            implied_volatility: sigma,
            delta,
            gamma,
            theta,
            vega,
            rho,
            time_decay_rate,
            gamma_exposure,
            theta_burn_rate,
            risk_level,
            risk_score,
        }
    }

    /// 0-100 composite risk score.
    ///
    /// Directional exposure is superlinear in |delta| so a 0.9-delta contract
    /// scores far above two 0.45s; gamma is normalized against the configured
    /// reference level; theta burn is the fraction of premium lost per day;
    /// same-day contracts pick up an urgency term that grows toward the close.
    fn risk_score(&self, delta: f64, gamma: f64, theta_burn_rate: f64, t: f64) -> f64 {
        let delta_risk = (delta.abs().powf(1.5) * 25.0).min(25.0);
        let gamma_risk = (gamma / self.config.reference_gamma * 30.0).min(30.0);
        let theta_risk = (theta_burn_rate * 100.0).min(25.0);
        let time_risk = if t < 1.0 / 365.0 {
            ((1.0 - t * 365.0) * 20.0).clamp(0.0, 20.0)
        } else {
            0.0
        };
        (delta_risk + gamma_risk.max(0.0) + theta_risk + time_risk).clamp(0.0, 100.0)
    }

    /// Annualized time to expiry.
    ///
    /// Same-day expiries measure fractional hours to the close in the fixed
    /// exchange offset, floored at one second. A contract already past its
    /// close (or its expiry date) returns 0, which the caller turns into the
    /// sentinel. Future expiries use whole calendar days.
    fn time_to_expiry(&self, quote: &OptionQuote) -> f64 {
        let offset = match FixedOffset::east_opt(self.config.exchange_utc_offset_hours * 3600) {
            Some(o) => o,
            None => return 0.0,
        };
        let now_local = quote.timestamp.with_timezone(&offset);
        let today = now_local.date_naive();

        let days_to_expiry = (quote.expiry - today).num_days();
        if days_to_expiry < 0 {
            return 0.0;
        }
        if days_to_expiry == 0 {
            let close_time = match NaiveTime::from_hms_opt(self.config.market_close_hour, 0, 0) {
                Some(t) => t,
                None => return 0.0,
            };
            let close_local = today.and_time(close_time);
            let remaining: Duration = close_local - now_local.naive_local();
            if remaining <= Duration::zero() {
                return 0.0;
            }
            let hours = remaining.num_seconds() as f64 / 3600.0;
            return (hours / (365.0 * 24.0)).max(self.config.min_time_to_expiry);
        }
        (days_to_expiry as f64 / 365.0).max(self.config.min_time_to_expiry)
    }

    /// Most recent result computed for a symbol.
    pub fn cached(&self, symbol: &str) -> Option<&GreeksResult> {
        self.greeks_cache.get(symbol)
    }

    /// Most recent solved vol for an underlying.
    pub fn cached_vol(&self, underlying: &str) -> Option<f64> {
        self.solver.cached_vol(underlying)
    }

    pub fn clear_caches(&mut self) {
        self.greeks_cache.clear();
        self.solver.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use gg_types::{OptionRight, QuoteGreeks};
    use rust_decimal_macros::dec;

    fn underlying_at(price: Decimal, ts: DateTime<Utc>) -> UnderlyingQuote {
        UnderlyingQuote {
            symbol: "QQQ".into(),
            timestamp: ts,
            price,
            volume: 1_000_000,
            bid: price - dec!(0.01),
            ask: price + dec!(0.01),
            bid_size: 500,
            ask_size: 500,
        }
    }

    fn option_at(
        strike: Decimal,
        expiry: NaiveDate,
        right: OptionRight,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> OptionQuote {
        OptionQuote {
            symbol: format!("QQQ-{strike}-{right}"),
            underlying: "QQQ".into(),
            strike,
            expiry,
            right,
            timestamp: ts,
            price,
            bid: price - dec!(0.05),
            ask: price + dec!(0.05),
            volume: 5000,
            open_interest: 10000,
            greeks: None,
        }
    }

    // 14:00 UTC = 09:00 at UTC-5: market open, 7 hours to the close.
    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_same_day_time_to_expiry_fractional() {
        let engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(2.50),
            ts,
        );
        let t = engine.time_to_expiry(&q);
        let expected = 7.0 / (365.0 * 24.0);
        assert!((t - expected).abs() < 1e-9, "t = {t}");
    }

    #[test]
    fn test_past_close_yields_sentinel() {
        let mut engine = GreeksEngine::new(GreeksEngineConfig::default());
        // 22:00 UTC = 17:00 at UTC-5, an hour after the close.
        let ts = Utc.with_ymd_and_hms(2024, 3, 15, 22, 0, 0).unwrap();
        let u = underlying_at(dec!(350), ts);
        let q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(0.05),
            ts,
        );
        assert_eq!(engine.time_to_expiry(&q), 0.0);
        let r = engine.compute(&q, &u);
        assert_eq!(r.risk_level, RiskLevel::Unknown);
    }

    #[test]
    fn test_future_expiry_whole_days() {
        let engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 22).unwrap(),
            OptionRight::Call,
            dec!(5.00),
            ts,
        );
        let t = engine.time_to_expiry(&q);
        assert!((t - 7.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_compute_reasonable_atm_call() {
        let mut engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let u = underlying_at(dec!(350), ts);
        let q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(2.00),
            ts,
        );
        let r = engine.compute(&q, &u);
        assert_ne!(r.risk_level, RiskLevel::Unknown);
        assert!(r.delta > 0.3 && r.delta < 0.7, "delta = {}", r.delta);
        assert!(r.theta < 0.0);
        assert!(r.implied_volatility > 0.0);
        assert!(r.risk_score > 0.0 && r.risk_score <= 100.0);
        assert!(engine.cached(&q.symbol).is_some());
    }

    #[test]
    fn test_zero_price_yields_sentinel() {
        let mut engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let u = underlying_at(dec!(350), ts);
        let q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(0),
            ts,
        );
        let r = engine.compute(&q, &u);
        assert_eq!(r.risk_level, RiskLevel::Unknown);
        assert_eq!(r.delta, 0.0);
        assert_eq!(r.risk_score, 0.0);
    }

    #[test]
    fn test_fresh_feed_greeks_used_verbatim() {
        let mut engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let u = underlying_at(dec!(350), ts);
        let mut q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(2.00),
            ts,
        );
        q.greeks = Some(QuoteGreeks {
            delta: 0.52,
            gamma: 0.08,
            theta: -1.10,
            vega: 0.04,
            implied_vol: 0.42,
            computed_at: ts,
        });
        let r = engine.compute(&q, &u);
        assert!((r.delta - 0.52).abs() < 1e-12);
        assert!((r.implied_volatility - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_stale_feed_greeks_recomputed() {
        let mut engine = GreeksEngine::new(GreeksEngineConfig::default());
        let ts = morning();
        let u = underlying_at(dec!(350), ts);
        let mut q = option_at(
            dec!(350),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            OptionRight::Call,
            dec!(2.00),
            ts,
        );
        q.greeks = Some(QuoteGreeks {
            delta: 0.99,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            implied_vol: 0.42,
            computed_at: ts - Duration::minutes(10),
        });
        let r = engine.compute(&q, &u);
        // Stale block ignored; delta comes from the model, not the feed.
        assert!(r.delta < 0.9, "delta = {}", r.delta);
    }

    #[test]
    fn test_same_day_urgency_raises_score() {
        let cfg = GreeksEngineConfig::default();
        let engine = GreeksEngine::new(cfg);
        let near_close = engine.risk_score(0.5, 0.02, 0.3, 0.5 / (365.0 * 24.0));
        let next_week = engine.risk_score(0.5, 0.02, 0.3, 7.0 / 365.0);
        assert!(near_close > next_week);
    }

    #[test]
    fn test_risk_score_clamped() {
        let engine = GreeksEngine::new(GreeksEngineConfig::default());
        let score = engine.risk_score(1.0, 10.0, 50.0, 1e-9);
        assert!(score <= 100.0);
    }
}
