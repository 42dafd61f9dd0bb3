//! Pre-trade admission checks and portfolio-level limit checks.
//!
//! Pure functions over snapshots; the manager owns the lock and the alert
//! plumbing.

use gg_types::{AlertSeverity, Position, PositionLimits, RiskEvent, RiskMetrics};
use rust_decimal::Decimal;

/// Why a candidate position was refused admission. Maps to exactly one alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRejection {
    pub event: RiskEvent,
    pub severity: AlertSeverity,
    pub message: String,
}

/// One breached portfolio limit. Maps to exactly one alert.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioViolation {
    pub event: RiskEvent,
    pub severity: AlertSeverity,
    pub message: String,
}

pub struct LimitEnforcer;

impl LimitEnforcer {
    /// Validate a candidate position against the hard limits.
    ///
    /// Checks run in order: single-position value, total book value, daily
    /// trade count, per-underlying contract count. The first failure wins.
    pub fn check_admission(
        limits: &PositionLimits,
        existing: &[&Position],
        daily_trades: u32,
        candidate: &Position,
    ) -> Result<(), AdmissionRejection> {
        if candidate.current_value > limits.max_single_position_value {
            return Err(AdmissionRejection {
                event: RiskEvent::PositionLimitExceeded,
                severity: AlertSeverity::Critical,
                message: format!(
                    "single position value {:.2} > limit {:.2}",
                    candidate.current_value, limits.max_single_position_value
                ),
            });
        }

        let total: Decimal = existing.iter().map(|p| p.current_value.abs()).sum();
        if total + candidate.current_value > limits.max_total_position_value {
            return Err(AdmissionRejection {
                event: RiskEvent::PositionLimitExceeded,
                severity: AlertSeverity::Critical,
                message: format!(
                    "total position value {:.2} > limit {:.2}",
                    total + candidate.current_value,
                    limits.max_total_position_value
                ),
            });
        }

        if daily_trades >= limits.max_daily_trades {
            return Err(AdmissionRejection {
                event: RiskEvent::PositionLimitExceeded,
                severity: AlertSeverity::High,
                message: format!(
                    "daily trade count {} >= limit {}",
                    daily_trades, limits.max_daily_trades
                ),
            });
        }

        if let Some(underlying) = &candidate.underlying {
            let count = existing
                .iter()
                .filter(|p| p.underlying.as_deref() == Some(underlying.as_str()))
                .count();
            if count >= limits.max_options_per_underlying {
                return Err(AdmissionRejection {
                    event: RiskEvent::ConcentrationRisk,
                    severity: AlertSeverity::Medium,
                    message: format!(
                        "{count} contracts on {underlying} >= limit {}",
                        limits.max_options_per_underlying
                    ),
                });
            }
        }

        Ok(())
    }

    /// Compare aggregated metrics against the portfolio-level limits.
    ///
    /// `daily_loss_limit` is positive; a daily PnL below its negation is the
    /// one critical violation here.
    pub fn check_portfolio(
        limits: &PositionLimits,
        metrics: &RiskMetrics,
        daily_loss_limit: Decimal,
    ) -> Vec<PortfolioViolation> {
        let mut violations = Vec::new();

        if metrics.daily_pnl < -daily_loss_limit {
            violations.push(PortfolioViolation {
                event: RiskEvent::DailyLossLimit,
                severity: AlertSeverity::Critical,
                message: format!(
                    "daily loss {:.2} breaches limit {:.2}",
                    metrics.daily_pnl, daily_loss_limit
                ),
            });
        }

        if metrics.portfolio_delta.abs() > limits.max_portfolio_delta {
            violations.push(PortfolioViolation {
                event: RiskEvent::ConcentrationRisk,
                severity: AlertSeverity::High,
                message: format!(
                    "portfolio delta {:.2} exceeds {:.2}",
                    metrics.portfolio_delta, limits.max_portfolio_delta
                ),
            });
        }

        if metrics.portfolio_gamma.abs() > limits.max_portfolio_gamma {
            violations.push(PortfolioViolation {
                event: RiskEvent::ConcentrationRisk,
                severity: AlertSeverity::Medium,
                message: format!(
                    "portfolio gamma {:.4} exceeds {:.4}",
                    metrics.portfolio_gamma, limits.max_portfolio_gamma
                ),
            });
        }

        // Theta limit is a negative bound: breach means burning faster.
        if metrics.portfolio_theta < limits.max_portfolio_theta {
            violations.push(PortfolioViolation {
                event: RiskEvent::ConcentrationRisk,
                severity: AlertSeverity::Medium,
                message: format!(
                    "portfolio theta {:.2} below {:.2}",
                    metrics.portfolio_theta, limits.max_portfolio_theta
                ),
            });
        }

        if metrics.portfolio_vega.abs() > limits.max_portfolio_vega {
            violations.push(PortfolioViolation {
                event: RiskEvent::ExtremeVolatility,
                severity: AlertSeverity::Medium,
                message: format!(
                    "portfolio vega {:.2} exceeds {:.2}",
                    metrics.portfolio_vega, limits.max_portfolio_vega
                ),
            });
        }

        if metrics.concentration_risk > limits.max_concentration_pct {
            violations.push(PortfolioViolation {
                event: RiskEvent::ConcentrationRisk,
                severity: AlertSeverity::Medium,
                message: format!(
                    "concentration {:.2}% exceeds {:.2}%",
                    metrics.concentration_risk * 100.0,
                    limits.max_concentration_pct * 100.0
                ),
            });
        }

        violations
    }
}
