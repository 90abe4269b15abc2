//! Opportunity aggregation
//!
//! Runs the active strategies over one snapshot, then collapses the
//! combined candidate list to at most one opportunity per market and
//! ranks it by expected value. Ordering is deterministic: ties keep the
//! order opportunities were produced in, so the strategy sequence fixed
//! at startup fixes the output.

use crate::strategy::Strategy;
use crate::types::{MarketSnapshot, Opportunity, PositionMap};
use std::collections::HashMap;
use tracing::{debug, info};

/// One full strategy pass over a snapshot, deduplicated and ranked.
pub async fn collect(
    strategies: &[Box<dyn Strategy>],
    markets: &[MarketSnapshot],
    open_positions: &PositionMap,
) -> Vec<Opportunity> {
    let mut all = Vec::new();
    for strategy in strategies {
        if !strategy.is_active() {
            debug!(strategy = strategy.name(), "inactive, skipped");
            continue;
        }
        let found = strategy.find_opportunities(markets, open_positions).await;
        info!(
            strategy = strategy.name(),
            candidates = found.len(),
            "strategy pass complete"
        );
        all.extend(found);
    }
    dedup_and_rank(all)
}

/// Keep the highest-expected-value opportunity per market, preserving
/// first-seen position on ties, then sort by expected value descending.
pub fn dedup_and_rank(opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut slot_by_market: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Opportunity> = Vec::new();

    for opportunity in opportunities {
        match slot_by_market.get(&opportunity.market_id) {
            Some(&slot) => {
                // Strictly greater: the incumbent wins ties
                if opportunity.expected_value > kept[slot].expected_value {
                    debug!(
                        market_id = %opportunity.market_id,
                        "replacing duplicate with higher expected value"
                    );
                    kept[slot] = opportunity;
                }
            }
            None => {
                slot_by_market.insert(opportunity.market_id.clone(), kept.len());
                kept.push(opportunity);
            }
        }
    }

    // Stable sort: equal expected values keep insertion order
    kept.sort_by(|a, b| b.expected_value.cmp(&a.expected_value));
    kept
}
