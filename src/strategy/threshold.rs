//! Rule-based threshold strategy
//!
//! Buys an outcome priced at or below the buy threshold when the gap to
//! that threshold clears the minimum edge; for a binary market whose YES
//! has run past the sell threshold it proposes the NO side instead. News
//! coverage, when available, adjusts confidence but never creates or
//! vetoes an opportunity on its own.

use super::{merge_options, Strategy};
use crate::client::news::{NewsSignal, NewsSource};
use crate::config::ThresholdConfig;
use crate::error::Result;
use crate::signal;
use crate::types::{MarketSnapshot, Opportunity};
use crate::utils;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, warn};

const BASE_CONFIDENCE: Decimal = dec!(0.8);
const PRICE_CONFIDENCE_WEIGHT: Decimal = dec!(0.6);
const NEWS_CONFIDENCE_WEIGHT: Decimal = dec!(0.4);

pub struct ThresholdStrategy {
    options: ThresholdConfig,
    news: Option<Arc<dyn NewsSource>>,
}

impl ThresholdStrategy {
    pub fn new(options: ThresholdConfig, news: Option<Arc<dyn NewsSource>>) -> Self {
        Self { options, news }
    }

    async fn news_signal(&self, market: &MarketSnapshot) -> Option<NewsSignal> {
        if !self.options.use_news {
            return None;
        }
        let news = self.news.as_ref()?;
        match news.market_signal(&market.question).await {
            Ok(signal) if !signal.articles.is_empty() => Some(signal),
            Ok(_) => None,
            Err(error) => {
                warn!(market_id = %market.id, %error, "news lookup failed, pricing alone");
                None
            }
        }
    }

    /// Confidence and evidence for one candidate side.
    fn build_opportunity(
        &self,
        market: &MarketSnapshot,
        outcome: &str,
        price: Decimal,
        edge: Decimal,
        news: Option<&NewsSignal>,
    ) -> Opportunity {
        let mut evidence = vec![format!(
            "price {} is {} below the {} buy threshold",
            utils::fmt_pct(price),
            utils::fmt_pct(edge),
            utils::fmt_pct(self.options.buy_threshold),
        )];

        let confidence = match news {
            Some(signal) => {
                let price_confidence = (dec!(0.5) + edge * dec!(4)).min(Decimal::ONE);
                let news_confidence = signal.confidence_for(outcome);
                evidence.push(format!(
                    "news {} ({} confidence, {} articles)",
                    signal.sentiment,
                    utils::fmt_pct(signal.confidence),
                    signal.articles.len(),
                ));
                for article in signal.articles.iter().take(2) {
                    evidence.push(format!("headline: {}", utils::truncate(&article.title, 80)));
                }
                price_confidence * PRICE_CONFIDENCE_WEIGHT
                    + news_confidence * NEWS_CONFIDENCE_WEIGHT
            }
            None => BASE_CONFIDENCE,
        };

        let hours = market.hours_to_expiry(Utc::now());
        let risk = signal::risk_score(market.volume, hours, edge);
        let expected_value = edge * dec!(100) * confidence;

        Opportunity::new(
            market.id.clone(),
            market.question.clone(),
            outcome,
            price,
            price + edge,
            confidence,
            expected_value,
            risk,
            market.volume,
            hours,
        )
        .with_evidence(evidence)
    }
}

#[async_trait]
impl Strategy for ThresholdStrategy {
    fn name(&self) -> &'static str {
        "threshold"
    }

    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity> {
        let news = self.news_signal(market).await;
        let mut opportunities = Vec::new();

        for (i, outcome) in market.outcomes.iter().enumerate() {
            let Some(&price) = market.prices.get(i) else {
                continue;
            };
            let label = outcome.to_uppercase();

            if price <= self.options.buy_threshold {
                let edge = self.options.buy_threshold - price;
                if edge >= self.options.min_edge {
                    debug!(market_id = %market.id, outcome = %label, %price, %edge, "cheap side");
                    opportunities.push(self.build_opportunity(
                        market,
                        &label,
                        price,
                        edge,
                        news.as_ref(),
                    ));
                }
            }

            // A YES past the sell threshold makes its complement cheap.
            if label == "YES" && price >= self.options.sell_threshold {
                let no_price = Decimal::ONE - price;
                let edge = price - self.options.sell_threshold;
                if edge >= self.options.min_edge && no_price <= self.options.buy_threshold {
                    debug!(market_id = %market.id, %no_price, %edge, "rich YES, proposing NO");
                    opportunities.push(self.build_opportunity(
                        market,
                        "NO",
                        no_price,
                        edge,
                        news.as_ref(),
                    ));
                }
            }
        }

        opportunities
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
