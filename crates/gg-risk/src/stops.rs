//! Per-position stop-loss rules with fire-once semantics.

use chrono::{DateTime, Duration, Utc};
use gg_types::{Position, RiskLevel};
use serde::{Deserialize, Serialize};

/// What a stop rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StopLossKind {
    /// Loss relative to entry exceeds this fraction.
    Price { max_loss_pct: f64 },
    /// Held past a fixed deadline.
    Time { deadline: DateTime<Utc> },
    /// Per-position delta magnitude exceeds this bound.
    Delta { max_abs_delta: f64 },
}

/// Rule lifecycle. `Fired` is terminal: a rule that has triggered once is
/// never evaluated again for that position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RuleState {
    Enabled,
    Fired { at: DateTime<Utc> },
}

/// A single stop-loss rule attached to one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLossRule {
    pub kind: StopLossKind,
    pub state: RuleState,
    pub created_at: DateTime<Utc>,
}

impl StopLossRule {
    pub fn new(kind: StopLossKind, created_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            state: RuleState::Enabled,
            created_at,
        }
    }

    pub fn is_fired(&self) -> bool {
        matches!(self.state, RuleState::Fired { .. })
    }

    /// Evaluate the rule against the position's current state.
    ///
    /// Returns the trigger message the first time the condition holds, and
    /// flips the rule to `Fired`; all later calls return `None`.
    pub fn evaluate(&mut self, position: &Position, now: DateTime<Utc>) -> Option<String> {
        if self.is_fired() {
            return None;
        }

        let message = match self.kind {
            StopLossKind::Price { max_loss_pct } => {
                let loss_pct = position.loss_pct();
                if loss_pct > max_loss_pct {
                    Some(format!(
                        "price stop: loss {:.2}% > {:.2}%",
                        loss_pct * 100.0,
                        max_loss_pct * 100.0
                    ))
                } else {
                    None
                }
            }
            StopLossKind::Time { deadline } => {
                if now > deadline {
                    let held = (now - position.entry_time).num_minutes();
                    Some(format!("time stop: held {held} minutes past deadline"))
                } else {
                    None
                }
            }
            StopLossKind::Delta { max_abs_delta } => {
                if position.delta.abs() > max_abs_delta {
                    Some(format!(
                        "delta stop: |{:.3}| > {:.3}",
                        position.delta, max_abs_delta
                    ))
                } else {
                    None
                }
            }
        };

        if message.is_some() {
            self.state = RuleState::Fired { at: now };
        }
        message
    }
}

/// The three default rules attached to every admitted position: a price stop
/// and a time stop sized by the configured risk level, plus a fixed delta
/// bound.
pub fn default_rules(risk_level: RiskLevel, now: DateTime<Utc>) -> Vec<StopLossRule> {
    vec![
        StopLossRule::new(
            StopLossKind::Price {
                max_loss_pct: risk_level.position_loss_pct(),
            },
            now,
        ),
        StopLossRule::new(
            StopLossKind::Time {
                deadline: now + Duration::minutes(risk_level.time_stop_minutes()),
            },
            now,
        ),
        StopLossRule::new(StopLossKind::Delta { max_abs_delta: 0.8 }, now),
    ]
}
