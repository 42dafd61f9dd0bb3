use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard equity-option contract multiplier.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// An open option position tracked by the ledger.
///
/// Invariants maintained by [`Position::mark_price`]:
/// `current_value = |quantity| * current_price * 100` and
/// `unrealized_pnl = (current_price - entry_price) * quantity * 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    pub symbol: String,
    pub underlying: Option<String>,
    /// Signed contract count: positive = long, negative = short.
    pub quantity: i64,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub current_price: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,

    // Per-position Greeks (per-contract values scaled by quantity).
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,

    /// Bid-ask spread as a fraction of the option price.
    pub bid_ask_spread: f64,
}

impl Position {
    /// Open a new position. The id is generated when `position_id` is needed;
    /// entry price seeds the current price so the value invariant holds from
    /// the first tick.
    pub fn open(
        symbol: impl Into<String>,
        underlying: Option<String>,
        quantity: i64,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        let mut p = Self {
            position_id: generate_position_id(),
            symbol: symbol.into(),
            underlying,
            quantity,
            entry_price,
            entry_time,
            current_price: entry_price,
            current_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            bid_ask_spread: 0.0,
        };
        p.mark_price(entry_price);
        p
    }

    /// Re-mark the position at a new price, updating value and unrealized PnL.
    pub fn mark_price(&mut self, price: Decimal) {
        let multiplier = Decimal::from(CONTRACT_MULTIPLIER);
        self.current_price = price;
        self.current_value = Decimal::from(self.quantity.abs()) * price * multiplier;
        self.unrealized_pnl =
            (price - self.entry_price) * Decimal::from(self.quantity) * multiplier;
    }

    /// Replace per-position Greeks from per-contract values.
    pub fn set_contract_greeks(&mut self, delta: f64, gamma: f64, theta: f64, vega: f64) {
        let qty = self.quantity as f64;
        self.delta = delta * qty;
        self.gamma = gamma * qty;
        self.theta = theta * qty;
        self.vega = vega * qty;
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Signed loss fraction relative to entry: positive when the position is
    /// losing money, for either direction.
    pub fn loss_pct(&self) -> f64 {
        if self.entry_price <= Decimal::ZERO {
            return 0.0;
        }
        let entry = decimal_to_f64(self.entry_price);
        let current = decimal_to_f64(self.current_price);
        let mut loss = (entry - current) / entry;
        if self.is_short() {
            loss = -loss;
        }
        loss
    }
}

fn generate_position_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("POS-{}", &raw[..8].to_uppercase())
}

fn decimal_to_f64(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}

/// Hard limits enforced before and after position admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLimits {
    pub max_single_position_value: Decimal,
    pub max_total_position_value: Decimal,
    pub max_options_per_underlying: usize,
    /// Max fraction of total value a single position may represent.
    pub max_concentration_pct: f64,
    pub max_daily_trades: u32,
    pub max_portfolio_delta: f64,
    pub max_portfolio_gamma: f64,
    /// Negative bound: portfolio theta more negative than this is a breach.
    pub max_portfolio_theta: f64,
    pub max_portfolio_vega: f64,
}

impl PositionLimits {
    /// Derive limits from a capital figure: single position capped at 10% of
    /// capital, Greek exposures scaled to capital.
    pub fn scaled_to_capital(capital: Decimal) -> Self {
        use rust_decimal::prelude::ToPrimitive;
        let cap = capital.to_f64().unwrap_or(0.0);
        Self {
            max_single_position_value: capital * Decimal::from_f64(0.1).unwrap_or(Decimal::ZERO),
            max_total_position_value: capital,
            max_options_per_underlying: 20,
            max_concentration_pct: 0.3,
            max_daily_trades: 100,
            max_portfolio_delta: cap * 0.01,
            max_portfolio_gamma: cap * 0.005,
            max_portfolio_theta: -cap * 0.002,
            max_portfolio_vega: cap * 0.01,
        }
    }
}

impl Default for PositionLimits {
    fn default() -> Self {
        Self::scaled_to_capital(Decimal::from(100_000))
    }
}

/// Point-in-time aggregated portfolio risk metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub timestamp: DateTime<Utc>,

    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub daily_pnl: Decimal,
    pub total_pnl: Decimal,

    pub total_position_value: Decimal,
    pub position_count: usize,
    /// Largest single position value as a fraction of total value.
    pub concentration_risk: f64,

    pub portfolio_delta: f64,
    pub portfolio_gamma: f64,
    pub portfolio_theta: f64,
    pub portfolio_vega: f64,

    pub avg_bid_ask_spread: f64,
    /// 0-100, higher = riskier.
    pub risk_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_open_generates_id_and_value() {
        let p = Position::open("QQQ240101C350", Some("QQQ".into()), 10, dec!(3.50), Utc::now());
        assert!(p.position_id.starts_with("POS-"));
        assert_eq!(p.position_id.len(), 12);
        // 10 contracts * $3.50 * 100
        assert_eq!(p.current_value, dec!(3500));
        assert_eq!(p.unrealized_pnl, dec!(0));
    }

    #[test]
    fn test_mark_price_invariants() {
        let mut p = Position::open("X", None, -5, dec!(2.00), Utc::now());
        p.mark_price(dec!(2.50));
        // |−5| * 2.50 * 100
        assert_eq!(p.current_value, dec!(1250));
        // (2.50 − 2.00) * −5 * 100
        assert_eq!(p.unrealized_pnl, dec!(-250));
    }

    #[test]
    fn test_loss_pct_long() {
        let mut p = Position::open("X", None, 1, dec!(4.00), Utc::now());
        p.mark_price(dec!(3.00));
        assert!((p.loss_pct() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_loss_pct_short_flips_sign() {
        let mut p = Position::open("X", None, -1, dec!(4.00), Utc::now());
        p.mark_price(dec!(5.00)); // short loses when price rises
        assert!((p.loss_pct() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_set_contract_greeks_scales_by_quantity() {
        let mut p = Position::open("X", None, -4, dec!(1.00), Utc::now());
        p.set_contract_greeks(0.5, 0.02, -0.10, 0.05);
        assert!((p.delta - (-2.0)).abs() < 1e-12);
        assert!((p.gamma - (-0.08)).abs() < 1e-12);
        assert!((p.theta - 0.40).abs() < 1e-12);
        assert!((p.vega - (-0.20)).abs() < 1e-12);
    }

    #[test]
    fn test_limits_scaled_to_capital() {
        let limits = PositionLimits::scaled_to_capital(dec!(50_000));
        assert_eq!(limits.max_single_position_value, dec!(5000.0));
        assert_eq!(limits.max_total_position_value, dec!(50_000));
        assert!((limits.max_portfolio_delta - 500.0).abs() < 1e-9);
        assert!(limits.max_portfolio_theta < 0.0);
    }
}
