//! Black-Scholes pricing, implied volatility, and the 0DTE greeks engine.
//!
//! The math kernel ([`black_scholes`]) and solver ([`implied_vol`]) are pure
//! and lock-free; callers that share a [`GreeksEngine`] across threads wrap
//! it themselves.

pub mod black_scholes;
pub mod engine;
pub mod implied_vol;
pub mod portfolio;

pub use black_scholes::{greeks, price, Greeks};
pub use engine::{GreeksEngine, GreeksEngineConfig, GreeksResult};
pub use implied_vol::{IvSolver, IvSolverConfig};
pub use portfolio::PortfolioAggregator;
