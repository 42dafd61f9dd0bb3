//! The risk manager facade: position ledger, stop rules, limit checks, and
//! the alert bus behind one lock.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use gg_pricing::{GreeksEngine, GreeksEngineConfig, PortfolioAggregator};
use gg_types::{
    AlertSeverity, Position, PositionLimits, QuoteEvent, RiskAlert, RiskEvent, RiskLevel,
    RiskMetrics, UnderlyingQuote,
};
use parking_lot::Mutex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::limits::LimitEnforcer;
use crate::stops::{default_rules, StopLossRule};

type AlertCallback = Box<dyn Fn(&RiskAlert) + Send>;
type EmergencyCallback = Box<dyn Fn() + Send>;

/// Risk manager configuration.
#[derive(Debug, Clone)]
pub struct RiskManagerConfig {
    /// Risk appetite; sizes the daily loss limit and the default stop rules.
    pub risk_level: RiskLevel,
    pub capital: Decimal,
    pub limits: PositionLimits,
    pub monitor_interval: StdDuration,
    /// Alerts older than this are pruned by the monitor loop.
    pub alert_retention: Duration,
    /// Bid-ask spread fraction above which a position is flagged illiquid.
    pub liquidity_spread_threshold: f64,
    pub engine: GreeksEngineConfig,
}

impl Default for RiskManagerConfig {
    fn default() -> Self {
        let capital = Decimal::from(100_000);
        Self {
            risk_level: RiskLevel::Medium,
            capital,
            limits: PositionLimits::scaled_to_capital(capital),
            monitor_interval: StdDuration::from_secs(5),
            alert_retention: Duration::hours(24),
            liquidity_spread_threshold: 0.05,
            engine: GreeksEngineConfig::default(),
        }
    }
}

/// Snapshot handed to dashboards and CLIs.
#[derive(Debug, Clone, Serialize)]
pub struct RiskSummary {
    pub metrics: RiskMetrics,
    pub limits: PositionLimits,
    pub daily_trades: u32,
    pub halted: bool,
    /// Alert counts in the retained history, keyed by severity.
    pub alert_counts: HashMap<String, usize>,
}

struct ManagerState {
    positions: HashMap<String, Position>,
    rules: HashMap<String, Vec<StopLossRule>>,
    alerts: Vec<RiskAlert>,
    underlyings: HashMap<String, UnderlyingQuote>,
    engine: GreeksEngine,
    daily_trades: u32,
    daily_realized: Decimal,
    realized_pnl: Decimal,
    halted: bool,
    alert_callbacks: Vec<AlertCallback>,
    emergency_callback: Option<EmergencyCallback>,
}

/// Thread-safe risk manager.
///
/// All shared state sits behind a single mutex; every public operation
/// acquires it for the duration of the call and releases before returning.
/// Registered callbacks run synchronously while the lock is held, so they
/// must be non-reentrant: a callback that calls back into the manager will
/// deadlock. Callback panics are caught and logged, never propagated.
pub struct RiskManager {
    config: RiskManagerConfig,
    state: Mutex<ManagerState>,
}

impl RiskManager {
    pub fn new(config: RiskManagerConfig) -> Self {
        let engine = GreeksEngine::new(config.engine.clone());
        info!(
            risk_level = %config.risk_level,
            capital = %config.capital,
            "risk manager initialized"
        );
        Self {
            config,
            state: Mutex::new(ManagerState {
                positions: HashMap::new(),
                rules: HashMap::new(),
                alerts: Vec::new(),
                underlyings: HashMap::new(),
                engine,
                daily_trades: 0,
                daily_realized: Decimal::ZERO,
                realized_pnl: Decimal::ZERO,
                halted: false,
                alert_callbacks: Vec::new(),
                emergency_callback: None,
            }),
        }
    }

    pub fn config(&self) -> &RiskManagerConfig {
        &self.config
    }

    /// Daily loss limit in currency terms, derived from the risk appetite.
    pub fn daily_loss_limit(&self) -> Decimal {
        let pct = Decimal::from_f64(self.config.risk_level.daily_loss_pct())
            .unwrap_or(Decimal::ZERO);
        self.config.capital * pct
    }

    /// Admit a position into the ledger.
    ///
    /// Returns `false` (after emitting one alert) when a limit rejects it or
    /// trading is halted; the ledger is untouched in that case. Admission
    /// attaches the three default stop rules and counts against the daily
    /// trade budget.
    pub fn add_position(&self, position: Position) -> bool {
        let mut state = self.state.lock();

        if state.halted {
            let alert = RiskAlert::new(
                RiskEvent::EmergencyHalt,
                AlertSeverity::High,
                "trading halted, position refused",
            )
            .for_position(position.position_id.clone());
            Self::emit(&mut state, alert);
            return false;
        }

        let existing: Vec<&Position> = state.positions.values().collect();
        let admission = LimitEnforcer::check_admission(
            &self.config.limits,
            &existing,
            state.daily_trades,
            &position,
        );
        drop(existing);

        if let Err(rejection) = admission {
            warn!(position_id = %position.position_id, %rejection.message, "position rejected");
            let alert = RiskAlert::new(rejection.event, rejection.severity, rejection.message)
                .for_position(position.position_id.clone());
            Self::emit(&mut state, alert);
            return false;
        }

        let id = position.position_id.clone();
        let now = Utc::now();
        state
            .rules
            .insert(id.clone(), default_rules(self.config.risk_level, now));
        state.positions.insert(id.clone(), position);
        state.daily_trades += 1;
        info!(position_id = %id, count = state.positions.len(), "position added");
        true
    }

    /// Apply a market-data event to a position and run its per-position
    /// checks. Unknown ids are a no-op returning no alerts.
    pub fn update_position(&self, position_id: &str, event: &QuoteEvent) -> Vec<RiskAlert> {
        let mut state = self.state.lock();

        if !state.positions.contains_key(position_id) {
            return Vec::new();
        }

        match event {
            QuoteEvent::Underlying(u) => {
                state.underlyings.insert(u.symbol.clone(), u.clone());
            }
            QuoteEvent::Option(q) => {
                let underlying = state.underlyings.get(&q.underlying).cloned();
                let greeks = underlying.as_ref().map(|u| state.engine.compute(q, u));

                if let Some(position) = state.positions.get_mut(position_id) {
                    position.mark_price(q.price);
                    position.bid_ask_spread = q.spread_pct().to_f64().unwrap_or(0.0);
                    if let Some(g) = greeks {
                        position.set_contract_greeks(g.delta, g.gamma, g.theta, g.vega);
                    }
                }
            }
        }

        let mut alerts = Vec::new();
        let now = event.timestamp();

        // Stop rules, in insertion order. Each fires at most once.
        let position = match state.positions.get(position_id) {
            Some(p) => p.clone(),
            None => return alerts,
        };
        if let Some(rules) = state.rules.get_mut(position_id) {
            let mut fired = Vec::new();
            for rule in rules.iter_mut() {
                if let Some(message) = rule.evaluate(&position, now) {
                    fired.push(message);
                }
            }
            for message in fired {
                let alert = RiskAlert::new(RiskEvent::StopLossTriggered, AlertSeverity::High, message)
                    .for_position(position_id.to_string())
                    .with_action("close position immediately");
                alerts.push(Self::emit(&mut state, alert));
            }
        }

        if position.bid_ask_spread > self.config.liquidity_spread_threshold {
            let alert = RiskAlert::new(
                RiskEvent::LiquidityRisk,
                AlertSeverity::Medium,
                format!(
                    "bid-ask spread {:.2}% > {:.2}%",
                    position.bid_ask_spread * 100.0,
                    self.config.liquidity_spread_threshold * 100.0
                ),
            )
            .for_position(position_id.to_string());
            alerts.push(Self::emit(&mut state, alert));
        }

        alerts
    }

    /// Remove a position and its stop rules.
    pub fn remove_position(&self, position_id: &str) -> Option<Position> {
        let mut state = self.state.lock();
        let removed = state.positions.remove(position_id);
        if removed.is_some() {
            state.rules.remove(position_id);
            info!(position_id, "position removed");
        }
        removed
    }

    /// Run the portfolio-level limit checks, emitting one alert per breach.
    ///
    /// A daily-loss breach is critical and pulls the emergency brake.
    pub fn check_portfolio_risks(&self) -> Vec<RiskAlert> {
        let mut state = self.state.lock();
        let metrics = Self::aggregate(&state);
        let violations =
            LimitEnforcer::check_portfolio(&self.config.limits, &metrics, self.daily_loss_limit());

        let mut alerts = Vec::with_capacity(violations.len());
        for v in violations {
            let mut alert = RiskAlert::new(v.event, v.severity, v.message);
            if v.severity == AlertSeverity::Critical {
                alert = alert.with_action("stop trading and flatten the book");
            }
            alerts.push(Self::emit(&mut state, alert));
        }
        alerts
    }

    /// Current aggregated metrics.
    pub fn risk_metrics(&self) -> RiskMetrics {
        let state = self.state.lock();
        Self::aggregate(&state)
    }

    /// Metrics plus limits and alert counts, for dashboards.
    pub fn risk_summary(&self) -> RiskSummary {
        let state = self.state.lock();
        let metrics = Self::aggregate(&state);
        let mut alert_counts: HashMap<String, usize> = HashMap::new();
        for alert in &state.alerts {
            *alert_counts.entry(alert.severity.to_string()).or_default() += 1;
        }
        RiskSummary {
            metrics,
            limits: self.config.limits.clone(),
            daily_trades: state.daily_trades,
            halted: state.halted,
            alert_counts,
        }
    }

    /// Register an alert callback. Invoked under the lock; must not call
    /// back into the manager.
    pub fn on_alert(&self, callback: impl Fn(&RiskAlert) + Send + 'static) {
        self.state.lock().alert_callbacks.push(Box::new(callback));
    }

    /// Register the emergency-stop callback, invoked once per critical alert.
    /// Same non-reentrancy rule as [`RiskManager::on_alert`].
    pub fn on_emergency_stop(&self, callback: impl Fn() + Send + 'static) {
        self.state.lock().emergency_callback = Some(Box::new(callback));
    }

    /// Manually pull the emergency brake: halts admission and emits a
    /// critical alert.
    pub fn halt(&self, reason: &str) {
        let mut state = self.state.lock();
        let alert = RiskAlert::new(
            RiskEvent::EmergencyHalt,
            AlertSeverity::Critical,
            format!("emergency halt: {reason}"),
        );
        Self::emit(&mut state, alert);
    }

    pub fn is_halted(&self) -> bool {
        self.state.lock().halted
    }

    /// Book realized PnL into the daily and cumulative totals.
    pub fn record_realized_pnl(&self, pnl: Decimal) {
        let mut state = self.state.lock();
        state.realized_pnl += pnl;
        state.daily_realized += pnl;
    }

    /// Called once per trading day by an external scheduler.
    pub fn reset_daily_counters(&self) {
        let mut state = self.state.lock();
        state.daily_trades = 0;
        state.daily_realized = Decimal::ZERO;
        info!("daily counters reset");
    }

    pub fn alert_history(&self) -> Vec<RiskAlert> {
        self.state.lock().alerts.clone()
    }

    /// Drop alerts older than the retention window. The monitor loop calls
    /// this every tick.
    pub fn prune_expired_alerts(&self) {
        let cutoff = Utc::now() - self.config.alert_retention;
        let mut state = self.state.lock();
        let before = state.alerts.len();
        state.alerts.retain(|a| a.timestamp >= cutoff);
        let pruned = before - state.alerts.len();
        if pruned > 0 {
            debug!(pruned, "expired alerts pruned");
        }
    }

    // ---- internals (lock already held) ----

    fn aggregate(state: &ManagerState) -> RiskMetrics {
        let positions: Vec<&Position> = state.positions.values().collect();
        let unrealized: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
        let daily_pnl = state.daily_realized + unrealized;
        PortfolioAggregator::aggregate(&positions, daily_pnl, state.realized_pnl)
    }

    /// Append to history, notify callbacks, and escalate critical alerts to
    /// the emergency stop. Returns the stored alert.
    fn emit(state: &mut ManagerState, mut alert: RiskAlert) -> RiskAlert {
        match alert.severity {
            AlertSeverity::Critical => warn!(event = %alert.event_type, %alert.message, "RISK CRITICAL"),
            AlertSeverity::High => warn!(event = %alert.event_type, %alert.message, "RISK HIGH"),
            _ => info!(event = %alert.event_type, %alert.message, "risk alert"),
        }

        if alert.severity == AlertSeverity::Critical {
            state.halted = true;
            if let Some(cb) = &state.emergency_callback {
                if catch_unwind(AssertUnwindSafe(|| cb())).is_err() {
                    error!("emergency-stop callback panicked");
                }
            }
            alert.auto_executed = true;
        }

        for cb in &state.alert_callbacks {
            if catch_unwind(AssertUnwindSafe(|| cb(&alert))).is_err() {
                error!("alert callback panicked");
            }
        }

        state.alerts.push(alert.clone());
        alert
    }
}
