use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use gg_risk::{start_monitor, RiskManager, RiskManagerConfig};
use gg_types::{OptionQuote, OptionRight, Position, QuoteEvent, UnderlyingQuote};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("GammaGuard risk manager demo");

    let manager = Arc::new(RiskManager::new(RiskManagerConfig::default()));

    manager.on_alert(|alert| {
        println!(
            "ALERT [{}] {}: {}",
            alert.severity, alert.event_type, alert.message
        );
    });
    manager.on_emergency_stop(|| {
        println!("EMERGENCY STOP: flatten everything");
    });

    // Open a 0DTE call position: 10 contracts at $2.50.
    let position = Position::open(
        "QQQ-0DTE-C352",
        Some("QQQ".into()),
        10,
        dec!(2.50),
        Utc::now(),
    );
    let id = position.position_id.clone();
    println!("Admitted: {}", manager.add_position(position));

    // Feed an underlying snapshot so greeks can be computed.
    let now = Utc::now();
    let underlying = UnderlyingQuote {
        symbol: "QQQ".into(),
        timestamp: now,
        price: dec!(350.00),
        volume: 2_000_000,
        bid: dec!(349.99),
        ask: dec!(350.01),
        bid_size: 800,
        ask_size: 650,
    };
    manager.update_position(&id, &QuoteEvent::Underlying(underlying));

    // The option sells off 28% from entry; the default price stop fires.
    let quote = OptionQuote {
        symbol: "QQQ-0DTE-C352".into(),
        underlying: "QQQ".into(),
        strike: dec!(352),
        expiry: now.date_naive(),
        right: OptionRight::Call,
        timestamp: now,
        price: dec!(1.80),
        bid: dec!(1.75),
        ask: dec!(1.85),
        volume: 12_000,
        open_interest: 45_000,
        greeks: None,
    };
    let alerts = manager.update_position(&id, &QuoteEvent::Option(quote));
    println!("Update produced {} alert(s)", alerts.len());

    let metrics = manager.risk_metrics();
    println!(
        "Portfolio: value={} uPnL={} delta={:.2} score={:.1}",
        metrics.total_position_value,
        metrics.unrealized_pnl,
        metrics.portfolio_delta,
        metrics.risk_score
    );

    // Let the monitor loop run a couple of ticks, then shut it down.
    let handle = start_monitor(manager.clone());
    thread::sleep(Duration::from_millis(50));
    handle.stop();

    println!(
        "Summary: {}",
        serde_json::to_string_pretty(&manager.risk_summary())?
    );

    Ok(())
}
