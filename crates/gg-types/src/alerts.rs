//! Risk alert types and severity levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk event classification for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskEvent {
    StopLossTriggered,
    PositionLimitExceeded,
    ConcentrationRisk,
    LiquidityRisk,
    ConnectionLost,
    ExtremeVolatility,
    DailyLossLimit,
    EmergencyHalt,
}

impl fmt::Display for RiskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskEvent::StopLossTriggered => "stop_loss_triggered",
            RiskEvent::PositionLimitExceeded => "position_limit_exceeded",
            RiskEvent::ConcentrationRisk => "concentration_risk",
            RiskEvent::LiquidityRisk => "liquidity_risk",
            RiskEvent::ConnectionLost => "connection_lost",
            RiskEvent::ExtremeVolatility => "extreme_volatility",
            RiskEvent::DailyLossLimit => "daily_loss_limit",
            RiskEvent::EmergencyHalt => "emergency_halt",
        };
        write!(f, "{}", s)
    }
}

/// Severity of a risk alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    /// Limit breached; triggers the emergency-stop callback.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

/// A single risk alert emitted by the risk manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub event_type: RiskEvent,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub position_id: Option<String>,
    pub recommended_action: Option<String>,
    /// Set when the emergency-stop callback ran for this alert.
    pub auto_executed: bool,
}

impl RiskAlert {
    pub fn new(event_type: RiskEvent, severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self {
            event_type,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            position_id: None,
            recommended_action: None,
            auto_executed: false,
        }
    }

    pub fn for_position(mut self, position_id: impl Into<String>) -> Self {
        self.position_id = Some(position_id.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.recommended_action = Some(action.into());
        self
    }
}
