use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk rating shared by per-contract Greeks assessment and the manager's
/// configured risk appetite.
///
/// `Unknown` is the sentinel rating produced when a Greeks computation
/// degenerates (expired contract, zero price, unsolvable vol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
    Unknown,
}

impl RiskLevel {
    /// Daily loss limit as a fraction of configured capital.
    pub fn daily_loss_pct(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.02,
            RiskLevel::Medium => 0.05,
            RiskLevel::High => 0.08,
            RiskLevel::Extreme => 0.10,
            RiskLevel::Unknown => 0.02,
        }
    }

    /// Per-position loss threshold for the default price stop.
    pub fn position_loss_pct(&self) -> f64 {
        match self {
            RiskLevel::Low => 0.05,
            RiskLevel::Medium => 0.10,
            RiskLevel::High => 0.12,
            RiskLevel::Extreme => 0.15,
            RiskLevel::Unknown => 0.05,
        }
    }

    /// Holding-time budget for the default time stop, in minutes.
    pub fn time_stop_minutes(&self) -> i64 {
        match self {
            RiskLevel::Low => 30,
            RiskLevel::Medium => 60,
            RiskLevel::High => 75,
            RiskLevel::Extreme => 90,
            RiskLevel::Unknown => 30,
        }
    }

    /// Map a 0-100 risk score onto a level.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Extreme
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
            RiskLevel::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}
