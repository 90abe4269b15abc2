//! Expiring-market strategy
//!
//! Looks for near-certain outcomes in markets inside their final window:
//! a price at or above the probability floor (or at or below its
//! complement) with enough volume to trust it. The remaining-time and
//! price-extremity terms set the confidence; risk is simply the residual
//! probability of the other side.

use super::{merge_options, Strategy};
use crate::config::ExpiringConfig;
use crate::types::{MarketSnapshot, Opportunity};
use crate::utils;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

const CONFIDENCE_CAP: Decimal = dec!(0.95);
const PREDICTED_NEAR_CERTAIN: Decimal = dec!(0.99);

pub struct ExpiringStrategy {
    options: ExpiringConfig,
}

impl ExpiringStrategy {
    pub fn new(options: ExpiringConfig) -> Self {
        Self { options }
    }
}

/// Hours to expiry if the market is inside the strategy's window and
/// liquid enough; `None` rejects the market entirely.
pub(super) fn eligibility(options: &ExpiringConfig, market: &MarketSnapshot) -> Option<Decimal> {
    let hours = market.hours_to_expiry(Utc::now())?;
    if hours < options.min_hours || hours > options.max_hours {
        debug!(market_id = %market.id, %hours, "outside expiry window");
        return None;
    }
    if market.volume < options.min_volume {
        debug!(market_id = %market.id, volume = %market.volume, "volume below floor");
        return None;
    }
    Some(hours)
}

/// The rule path proper, shared with the model-assisted variant's
/// fallback. Assumes eligibility has already been checked.
pub(super) fn rule_scan(
    options: &ExpiringConfig,
    market: &MarketSnapshot,
    hours: Decimal,
) -> Vec<Opportunity> {
    let mut opportunities = Vec::new();
    for (i, outcome) in market.outcomes.iter().enumerate() {
        let Some(&price) = market.prices.get(i) else {
            continue;
        };
        let label = outcome.to_uppercase();

        if price >= options.min_probability {
            opportunities.push(near_certain(options, market, &label, price, hours));
        } else if price <= Decimal::ONE - options.min_probability && label == "YES" {
            // A collapsed YES makes the complement near-certain.
            let no_price = Decimal::ONE - price;
            opportunities.push(near_certain(options, market, "NO", no_price, hours));
        }
    }
    opportunities
}

fn near_certain(
    options: &ExpiringConfig,
    market: &MarketSnapshot,
    outcome: &str,
    price: Decimal,
    hours: Decimal,
) -> Opportunity {
    let margin = Decimal::ONE - price;
    let denominator = Decimal::ONE - options.min_probability;
    let price_confidence = if denominator > Decimal::ZERO {
        (price - options.min_probability) / denominator
    } else {
        Decimal::ONE
    };
    let time_confidence = Decimal::ONE - hours / options.max_hours;
    let confidence = ((price_confidence + time_confidence) / dec!(2)).min(CONFIDENCE_CAP);

    let evidence = vec![
        format!(
            "{} priced {} with {} hours to resolution",
            outcome,
            utils::fmt_pct(price),
            hours.round_dp(1),
        ),
        format!("residual downside {}", utils::fmt_pct(margin)),
    ];

    Opportunity::new(
        market.id.clone(),
        market.question.clone(),
        outcome,
        price,
        PREDICTED_NEAR_CERTAIN,
        confidence,
        margin * dec!(100),
        margin,
        market.volume,
        Some(hours),
    )
    .with_evidence(evidence)
}

#[async_trait]
impl Strategy for ExpiringStrategy {
    fn name(&self) -> &'static str {
        "expiring"
    }

    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity> {
        match eligibility(&self.options, market) {
            Some(hours) => rule_scan(&self.options, market, hours),
            None => Vec::new(),
        }
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> crate::error::Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
