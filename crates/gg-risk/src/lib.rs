//! Real-time risk management: stop-loss rules, position limits, alerting,
//! and the background monitor loop.

pub mod limits;
pub mod manager;
pub mod monitor;
pub mod stops;

pub use limits::{AdmissionRejection, LimitEnforcer, PortfolioViolation};
pub use manager::{RiskManager, RiskManagerConfig, RiskSummary};
pub use monitor::{start_monitor, MonitorHandle};
pub use stops::{default_rules, RuleState, StopLossKind, StopLossRule};
