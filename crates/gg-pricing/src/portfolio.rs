//! Portfolio-level aggregation of per-position greeks and exposure.

use chrono::Utc;
use gg_types::{Position, RiskMetrics};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Pure aggregation over a ledger snapshot.
///
/// Positions already carry per-position greeks (per-contract values scaled by
/// quantity), so aggregation is a straight sum.
pub struct PortfolioAggregator;

impl PortfolioAggregator {
    pub fn aggregate(
        positions: &[&Position],
        daily_pnl: Decimal,
        realized_pnl: Decimal,
    ) -> RiskMetrics {
        let unrealized_pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
        let total_position_value: Decimal =
            positions.iter().map(|p| p.current_value.abs()).sum();

        let portfolio_delta: f64 = positions.iter().map(|p| p.delta).sum();
        let portfolio_gamma: f64 = positions.iter().map(|p| p.gamma).sum();
        let portfolio_theta: f64 = positions.iter().map(|p| p.theta).sum();
        let portfolio_vega: f64 = positions.iter().map(|p| p.vega).sum();

        let concentration_risk = if !positions.is_empty() && total_position_value > Decimal::ZERO {
            let max_value = positions
                .iter()
                .map(|p| p.current_value.abs())
                .max()
                .unwrap_or(Decimal::ZERO);
            (max_value / total_position_value).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };

        let avg_bid_ask_spread = if positions.is_empty() {
            0.0
        } else {
            positions.iter().map(|p| p.bid_ask_spread).sum::<f64>() / positions.len() as f64
        };

        // Fixed weights: PnL swing vs book size, concentration, liquidity.
        let upnl = unrealized_pnl.to_f64().unwrap_or(0.0);
        let value = total_position_value.to_f64().unwrap_or(0.0).max(1.0);
        let risk_score = (upnl.abs() / value * 50.0
            + concentration_risk * 30.0
            + avg_bid_ask_spread * 100.0 * 20.0)
            .clamp(0.0, 100.0);

        RiskMetrics {
            timestamp: Utc::now(),
            unrealized_pnl,
            realized_pnl,
            daily_pnl,
            total_pnl: unrealized_pnl + realized_pnl,
            total_position_value,
            position_count: positions.len(),
            concentration_risk,
            portfolio_delta,
            portfolio_gamma,
            portfolio_theta,
            portfolio_vega,
            avg_bid_ask_spread,
            risk_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(quantity: i64, entry: Decimal, mark: Decimal, delta: f64) -> Position {
        let mut p = Position::open("X", Some("QQQ".into()), quantity, entry, Utc::now());
        p.mark_price(mark);
        p.delta = delta;
        p.bid_ask_spread = 0.02;
        p
    }

    #[test]
    fn test_empty_portfolio() {
        let m = PortfolioAggregator::aggregate(&[], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(m.position_count, 0);
        assert_eq!(m.total_position_value, Decimal::ZERO);
        assert_eq!(m.concentration_risk, 0.0);
        assert_eq!(m.risk_score, 0.0);
    }

    #[test]
    fn test_sums_and_concentration() {
        let a = position(10, dec!(2.00), dec!(2.50), 5.0);
        let b = position(-5, dec!(3.00), dec!(3.00), -2.0);
        let m = PortfolioAggregator::aggregate(&[&a, &b], dec!(100), dec!(50));

        // values: 10*2.50*100 = 2500, 5*3.00*100 = 1500
        assert_eq!(m.total_position_value, dec!(4000));
        // uPnL: (2.50-2.00)*10*100 = 500, second flat
        assert_eq!(m.unrealized_pnl, dec!(500));
        assert_eq!(m.total_pnl, dec!(550));
        assert!((m.portfolio_delta - 3.0).abs() < 1e-12);
        assert!((m.concentration_risk - 0.625).abs() < 1e-9);
        assert_eq!(m.position_count, 2);
    }

    #[test]
    fn test_risk_score_components() {
        let a = position(10, dec!(2.00), dec!(2.50), 5.0);
        let m = PortfolioAggregator::aggregate(&[&a], Decimal::ZERO, Decimal::ZERO);
        // |500|/2500*50 = 10, concentration 1.0*30 = 30, spread 0.02*100*20 = 40
        assert!((m.risk_score - 80.0).abs() < 1e-9, "score = {}", m.risk_score);
    }

    #[test]
    fn test_risk_score_clamped_at_100() {
        let mut a = position(10, dec!(2.00), dec!(6.00), 5.0);
        a.bid_ask_spread = 0.10;
        let m = PortfolioAggregator::aggregate(&[&a], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(m.risk_score, 100.0);
    }
}
