//! Core domain types: market snapshots, opportunities, positions

use crate::utils;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One market as seen at scan time. Immutable for the whole iteration;
/// strategies only read it.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    /// Outcome labels, index-aligned with `prices`
    pub outcomes: Vec<String>,
    /// One price per outcome, already resolved through the source
    /// fallback chain by the market data client
    pub prices: Vec<Decimal>,
    pub volume: Decimal,
    pub end_date: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    /// Hours remaining until expiry, if the market carries an end date.
    pub fn hours_to_expiry(&self, now: DateTime<Utc>) -> Option<Decimal> {
        self.end_date.map(|end| utils::hours_until(end, now))
    }

    /// Price for a named outcome. For binary markets the NO price is
    /// derived as the YES complement when no explicit entry exists.
    pub fn price_for_outcome(&self, label: &str) -> Option<Decimal> {
        let wanted = label.to_uppercase();
        for (i, outcome) in self.outcomes.iter().enumerate() {
            if outcome.to_uppercase() == wanted {
                return self.prices.get(i).copied();
            }
        }
        if wanted == "NO" && self.outcomes.len() == 2 && self.outcomes[0].to_uppercase() == "YES" {
            return self.prices.first().map(|p| Decimal::ONE - p);
        }
        None
    }
}

/// A single proposed trade, produced by a strategy and consumed by the
/// aggregator and risk gate. Immutable after construction apart from the
/// append-only evidence list.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub market_id: String,
    pub question: String,
    pub outcome: String,
    pub current_price: Decimal,
    pub predicted_probability: Decimal,
    /// Strategy's self-assessed certainty, 0..=1
    pub confidence: Decimal,
    /// Percentage-scale expected return, used for ranking across strategies
    pub expected_value: Decimal,
    pub risk_score: Decimal,
    pub volume: Decimal,
    pub hours_to_expiry: Option<Decimal>,
    /// Human-readable justification lines, append-only
    pub evidence: Vec<String>,
    // Always |predicted_probability - current_price|; private so no code
    // path can set it independently of the two source fields.
    edge: Decimal,
}

impl Opportunity {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market_id: impl Into<String>,
        question: impl Into<String>,
        outcome: impl Into<String>,
        current_price: Decimal,
        predicted_probability: Decimal,
        confidence: Decimal,
        expected_value: Decimal,
        risk_score: Decimal,
        volume: Decimal,
        hours_to_expiry: Option<Decimal>,
    ) -> Self {
        Self {
            market_id: market_id.into(),
            question: question.into(),
            outcome: outcome.into(),
            current_price,
            predicted_probability,
            confidence,
            expected_value,
            risk_score,
            volume,
            hours_to_expiry,
            evidence: Vec::new(),
            edge: (predicted_probability - current_price).abs(),
        }
    }

    /// Absolute difference between the predicted probability and the
    /// current price; the core profitability signal.
    pub fn edge(&self) -> Decimal {
        self.edge
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn push_evidence(&mut self, line: impl Into<String>) {
        self.evidence.push(line.into());
    }
}

impl std::fmt::Display for Opportunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} @ {} (conf {})",
            utils::truncate(&self.question, 40),
            self.outcome,
            utils::fmt_pct(self.current_price),
            utils::fmt_pct(self.confidence),
        )
    }
}

/// An open position, keyed by market id in the agent's position map.
/// In-memory only; positions do not survive a restart.
#[derive(Debug, Clone)]
pub struct Position {
    pub market_id: String,
    pub outcome: String,
    /// Shares held
    pub size: Decimal,
}

pub type PositionMap = HashMap<String, Position>;

/// Result of an order submission to the execution venue.
#[derive(Debug, Clone)]
pub struct OrderResult {
    pub success: bool,
    pub message: String,
}

/// Sanity bound used when validating prices coming off the wire.
pub fn is_valid_price(p: Decimal) -> bool {
    p >= Decimal::ZERO && p <= dec!(1)
}
