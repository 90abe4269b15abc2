//! Polymarket Opportunity Agent
//!
//! Aggregates trade opportunities across prediction-market strategies and
//! pushes them through a shared risk gate before execution.
//!
//! ## Architecture
//!
//! ```text
//! Gamma snapshot → Strategies (threshold / expiring / fusion / index,
//!                  plus model-assisted variants) → Aggregator → Risk Gate
//!                                                                  ↓
//!                                               Paper log or CLOB order
//! ```

pub mod agent;
pub mod aggregator;
pub mod client;
pub mod config;
pub mod error;
pub mod risk;
pub mod signal;
pub mod strategy;
pub mod types;
pub mod utils;
