use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Option right — call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionRight::Call => write!(f, "Call"),
            OptionRight::Put => write!(f, "Put"),
        }
    }
}

/// Snapshot of the underlying's market state at a point in time.
///
/// Immutable once constructed — ingestion delivers a fresh snapshot per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub volume: i64,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_size: i64,
    pub ask_size: i64,
}

impl UnderlyingQuote {
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Feed-supplied Greeks attached to an option quote.
///
/// `computed_at` lets the engine decide whether the values are stale relative
/// to the quote's own timestamp; stale or absent Greeks are recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub implied_vol: f64,
    pub computed_at: DateTime<Utc>,
}

/// Snapshot of a single option contract's market state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub symbol: String,
    pub underlying: String,
    pub strike: Decimal,
    /// Expiry date (exchange calendar date).
    pub expiry: NaiveDate,
    pub right: OptionRight,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: i64,
    pub open_interest: i64,
    /// Greeks delivered by the feed, if any.
    pub greeks: Option<QuoteGreeks>,
}

impl OptionQuote {
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Bid-ask spread as a fraction of the quote price (0 when price is 0).
    pub fn spread_pct(&self) -> Decimal {
        if self.price > Decimal::ZERO {
            self.spread() / self.price
        } else {
            Decimal::ZERO
        }
    }

    pub fn is_call(&self) -> bool {
        self.right == OptionRight::Call
    }

    pub fn is_put(&self) -> bool {
        self.right == OptionRight::Put
    }
}

/// Market data payload accepted by `update_position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuoteEvent {
    Option(OptionQuote),
    Underlying(UnderlyingQuote),
}

impl QuoteEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            QuoteEvent::Option(q) => q.timestamp,
            QuoteEvent::Underlying(q) => q.timestamp,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            QuoteEvent::Option(q) => &q.symbol,
            QuoteEvent::Underlying(q) => &q.symbol,
        }
    }

    pub fn price(&self) -> Decimal {
        match self {
            QuoteEvent::Option(q) => q.price,
            QuoteEvent::Underlying(q) => q.price,
        }
    }
}
