//! Background risk monitor loop.
//!
//! One thread per manager: every tick it runs the portfolio checks and
//! prunes expired alerts. Stoppable via an atomic flag plus a shutdown
//! channel, joined with a bounded timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, tick, Sender};
use tracing::{info, warn};

use crate::manager::RiskManager;

/// Handle to a running monitor thread.
pub struct MonitorHandle {
    running: Arc<AtomicBool>,
    shutdown_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop to stop and wait for it, bounded at two seconds.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.join.take() {
            let deadline = Instant::now() + Duration::from_secs(2);
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
                info!("risk monitor stopped");
            } else {
                warn!("risk monitor did not stop within timeout");
            }
        }
    }
}

/// Spawn the monitor loop for a shared manager.
pub fn start_monitor(manager: Arc<RiskManager>) -> MonitorHandle {
    let interval = manager.config().monitor_interval;
    let running = Arc::new(AtomicBool::new(true));
    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

    let flag = running.clone();
    let join = thread::Builder::new()
        .name("risk-monitor".into())
        .spawn(move || {
            info!(interval_ms = interval.as_millis() as u64, "risk monitor started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        let alerts = manager.check_portfolio_risks();
                        if !alerts.is_empty() {
                            warn!(count = alerts.len(), "portfolio check raised alerts");
                        }
                        manager.prune_expired_alerts();
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        })
        .ok();

    if join.is_none() {
        warn!("failed to spawn risk monitor thread");
        running.store(false, Ordering::SeqCst);
    }

    MonitorHandle {
        running,
        shutdown_tx,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::RiskManagerConfig;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> RiskManagerConfig {
        RiskManagerConfig {
            monitor_interval: Duration::from_millis(20),
            ..RiskManagerConfig::default()
        }
    }

    #[test]
    fn monitor_starts_and_stops() {
        let mgr = Arc::new(RiskManager::new(fast_config()));
        let handle = start_monitor(mgr);
        assert!(handle.is_running());
        thread::sleep(Duration::from_millis(60));
        handle.stop();
    }

    #[test]
    fn monitor_picks_up_daily_loss_breach() {
        let mgr = Arc::new(RiskManager::new(fast_config()));
        let stops = Arc::new(AtomicUsize::new(0));
        {
            let n = stops.clone();
            mgr.on_emergency_stop(move || {
                n.fetch_add(1, Ordering::SeqCst);
            });
        }
        mgr.record_realized_pnl(dec!(-6000));

        let handle = start_monitor(mgr.clone());
        thread::sleep(Duration::from_millis(100));
        handle.stop();

        // The breach persists across ticks, so multiple alerts may land, but
        // at least one critical alert fired the emergency stop.
        assert!(stops.load(Ordering::SeqCst) >= 1);
        assert!(mgr.is_halted());
    }
}
