//! Index-rebalancing strategy
//!
//! Aligns the portfolio with an externally defined target allocation set
//! instead of hunting mispricing. Emits rebalance opportunities for
//! allocations whose relative deviation from current holdings exceeds the
//! threshold, and exit opportunities for holdings absent from the index.
//! Expected value is always zero so alignment trades never outrank
//! edge-driven ones.

use super::{merge_options, Strategy};
use crate::client::index::IndexSource;
use crate::config::IndexConfig;
use crate::error::Result;
use crate::types::{MarketSnapshot, Opportunity, PositionMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub struct IndexStrategy {
    options: IndexConfig,
    source: Option<Arc<dyn IndexSource>>,
    // Interior mutability: find_opportunities takes &self but the
    // rate limiter needs the previous check time.
    last_check: Mutex<Option<DateTime<Utc>>>,
}

impl IndexStrategy {
    pub fn new(options: IndexConfig, source: Option<Arc<dyn IndexSource>>) -> Self {
        Self {
            options,
            source,
            last_check: Mutex::new(None),
        }
    }

    fn due_for_check(&self, now: DateTime<Utc>) -> bool {
        let mut last = match self.last_check.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            if (now - previous).num_minutes() < self.options.check_interval_mins {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    fn rebalance_opportunity(
        &self,
        market: &MarketSnapshot,
        outcome: &str,
        target: Decimal,
        held: Decimal,
        deviation: Decimal,
        now: DateTime<Utc>,
    ) -> Opportunity {
        let price = market.prices.first().copied().unwrap_or(dec!(0.5));
        let delta = target - held;
        let action = if delta > Decimal::ZERO { "buy" } else { "sell" };
        let evidence = vec![format!(
            "{} {} shares of {} to match {} allocation (deviation {}%)",
            action,
            delta.abs().round_dp(2),
            outcome,
            self.options.index_id,
            (deviation * dec!(100)).round_dp(1),
        )];
        Opportunity::new(
            market.id.clone(),
            market.question.clone(),
            outcome,
            price,
            price,
            self.options.rebalance_confidence,
            Decimal::ZERO,
            self.options.rebalance_risk,
            market.volume,
            market.hours_to_expiry(now),
        )
        .with_evidence(evidence)
    }

    fn exit_opportunity(
        &self,
        market: &MarketSnapshot,
        outcome: &str,
        held: Decimal,
        now: DateTime<Utc>,
    ) -> Opportunity {
        let price = market.prices.first().copied().unwrap_or(dec!(0.5));
        let evidence = vec![format!(
            "exit {} shares of {}: market no longer in {}",
            held.round_dp(2),
            outcome,
            self.options.index_id,
        )];
        Opportunity::new(
            market.id.clone(),
            market.question.clone(),
            outcome,
            price,
            Decimal::ZERO,
            self.options.exit_confidence,
            Decimal::ZERO,
            self.options.exit_risk,
            market.volume,
            market.hours_to_expiry(now),
        )
        .with_evidence(evidence)
    }
}

#[async_trait]
impl Strategy for IndexStrategy {
    fn name(&self) -> &'static str {
        "index"
    }

    fn is_active(&self) -> bool {
        self.source.is_some() && !self.options.index_id.is_empty()
    }

    /// Alignment works on the whole portfolio, not single markets.
    async fn analyze_market(&self, _market: &MarketSnapshot) -> Vec<Opportunity> {
        Vec::new()
    }

    async fn find_opportunities(
        &self,
        markets: &[MarketSnapshot],
        open_positions: &PositionMap,
    ) -> Vec<Opportunity> {
        let Some(source) = self.source.as_ref() else {
            return Vec::new();
        };
        if self.options.index_id.is_empty() {
            return Vec::new();
        }
        let now = Utc::now();
        if !self.due_for_check(now) {
            debug!(index_id = %self.options.index_id, "index check not due yet");
            return Vec::new();
        }

        let status = match source.index_status().await {
            Ok(status) => status,
            Err(error) => {
                warn!(index_id = %self.options.index_id, %error, "index status unavailable");
                return Vec::new();
            }
        };

        let mut opportunities = Vec::new();
        for allocation in &status.target_allocations {
            let held = open_positions
                .get(&allocation.market_id)
                .map(|p| p.size)
                .unwrap_or(Decimal::ZERO);
            let deviation = if allocation.target_shares == Decimal::ZERO {
                if held > Decimal::ZERO {
                    Decimal::ONE
                } else {
                    Decimal::ZERO
                }
            } else {
                (allocation.target_shares - held).abs() / allocation.target_shares
            };
            if deviation <= self.options.rebalance_threshold {
                continue;
            }
            let Some(market) = markets.iter().find(|m| m.id == allocation.market_id) else {
                debug!(market_id = %allocation.market_id, "indexed market not in snapshot");
                continue;
            };
            opportunities.push(self.rebalance_opportunity(
                market,
                &allocation.outcome,
                allocation.target_shares,
                held,
                deviation,
                now,
            ));
        }

        // Held markets the index dropped; sorted for a stable scan order.
        let mut exits: Vec<_> = open_positions
            .values()
            .filter(|p| {
                p.size > Decimal::ZERO
                    && !status
                        .target_allocations
                        .iter()
                        .any(|a| a.market_id == p.market_id)
            })
            .collect();
        exits.sort_by(|a, b| a.market_id.cmp(&b.market_id));
        for position in exits {
            let Some(market) = markets.iter().find(|m| m.id == position.market_id) else {
                debug!(market_id = %position.market_id, "held market not in snapshot");
                continue;
            };
            opportunities.push(self.exit_opportunity(
                market,
                &position.outcome,
                position.size,
                now,
            ));
        }

        opportunities
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
