//! Signal-fusion strategy
//!
//! Combines the price, volume, and sentiment primitives into one weighted
//! probability per outcome and trades the side the blend favors. Scans
//! only the top markets by volume and returns a bounded, ranked slice per
//! pass, so it overrides the default market walk.

use super::{merge_options, Strategy};
use crate::client::news::{NewsSignal, NewsSource};
use crate::config::FusionConfig;
use crate::error::Result;
use crate::signal;
use crate::types::{MarketSnapshot, Opportunity, PositionMap};
use crate::utils;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, warn};

const CONFIDENCE_CAP: Decimal = dec!(0.95);
const WEEK_HOURS: Decimal = dec!(168);

pub struct FusionStrategy {
    options: FusionConfig,
    news: Option<Arc<dyn NewsSource>>,
}

impl FusionStrategy {
    pub fn new(options: FusionConfig, news: Option<Arc<dyn NewsSource>>) -> Self {
        Self { options, news }
    }

    async fn news_signal(&self, market: &MarketSnapshot) -> Option<NewsSignal> {
        let news = self.news.as_ref()?;
        match news.market_signal(&market.question).await {
            Ok(signal) if !signal.articles.is_empty() => Some(signal),
            Ok(_) => None,
            Err(error) => {
                warn!(market_id = %market.id, %error, "news lookup failed, neutral sentiment");
                None
            }
        }
    }

    /// Average per-article sentiment for one outcome side; neutral 0.5
    /// without coverage.
    fn sentiment_score(news: Option<&NewsSignal>, outcome: &str) -> Decimal {
        let Some(sig) = news.filter(|s| !s.articles.is_empty()) else {
            return dec!(0.5);
        };
        let total: Decimal = sig
            .articles
            .iter()
            .map(|a| signal::article_sentiment_score(a.sentiment, outcome))
            .sum();
        total / Decimal::from(sig.articles.len())
    }

    fn confidence_for(
        &self,
        edge: Decimal,
        volume: Decimal,
        price_score: Decimal,
        article_count: usize,
    ) -> Decimal {
        let mut confidence = dec!(0.5) + edge * dec!(0.3);
        if volume > dec!(500000) {
            confidence += dec!(0.2);
        } else if volume > dec!(100000) {
            confidence += dec!(0.1);
        }
        confidence += (Decimal::from(article_count) * dec!(0.05)).min(dec!(0.2));
        if price_score > dec!(0.7) || price_score < dec!(0.3) {
            confidence += dec!(0.1);
        }
        confidence.min(CONFIDENCE_CAP)
    }
}

#[async_trait]
impl Strategy for FusionStrategy {
    fn name(&self) -> &'static str {
        "fusion"
    }

    async fn find_opportunities(
        &self,
        markets: &[MarketSnapshot],
        open_positions: &PositionMap,
    ) -> Vec<Opportunity> {
        let mut candidates: Vec<&MarketSnapshot> = markets
            .iter()
            .filter(|m| m.volume >= self.options.min_volume)
            .collect();
        candidates.sort_by(|a, b| b.volume.cmp(&a.volume));
        candidates.truncate(self.options.top_markets);

        let mut opportunities = Vec::new();
        for market in candidates {
            if open_positions.contains_key(&market.id) {
                debug!(market_id = %market.id, "skipping held market");
                continue;
            }
            opportunities.extend(self.analyze_market(market).await);
        }

        // Rank by confidence-weighted expected value and keep a bounded
        // slice; ties keep scan order.
        opportunities.sort_by(|a, b| {
            (b.expected_value * b.confidence).cmp(&(a.expected_value * a.confidence))
        });
        opportunities.truncate(self.options.max_results);
        opportunities
    }

    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity> {
        if market.volume < self.options.min_volume {
            return Vec::new();
        }
        let news = self.news_signal(market).await;
        let weight_sum =
            self.options.price_weight + self.options.volume_weight + self.options.sentiment_weight;
        if weight_sum <= Decimal::ZERO {
            return Vec::new();
        }
        let hours = market.hours_to_expiry(Utc::now());
        let volume_score = signal::volume_signal(market.volume);

        let mut opportunities = Vec::new();
        for (i, outcome) in market.outcomes.iter().enumerate() {
            let Some(&price) = market.prices.get(i) else {
                continue;
            };
            let label = outcome.to_uppercase();

            let price_score = signal::price_signal(price, &label);
            let sentiment_score = Self::sentiment_score(news.as_ref(), &label);
            let blended = (price_score * self.options.price_weight
                + volume_score * self.options.volume_weight
                + sentiment_score * self.options.sentiment_weight)
                / weight_sum;

            let edge = (blended - dec!(0.5)).abs();
            if edge < self.options.min_edge {
                continue;
            }

            // Blend above 0.5 backs this side; below it backs the
            // complement at the complement price.
            let favors_this_side = blended > dec!(0.5);
            let (target_outcome, target_price) = if favors_this_side {
                (label.clone(), price)
            } else if label == "YES" {
                ("NO".to_string(), Decimal::ONE - price)
            } else {
                ("YES".to_string(), Decimal::ONE - price)
            };

            let article_count = news.as_ref().map(|s| s.articles.len()).unwrap_or(0);
            let confidence = self.confidence_for(edge, market.volume, price_score, article_count);
            if confidence < self.options.min_confidence {
                debug!(market_id = %market.id, %confidence, "blend confidence below floor");
                continue;
            }

            let mut evidence = vec![
                format!(
                    "price signal {} at {}",
                    price_score,
                    utils::fmt_pct(price)
                ),
                format!("volume signal {} on {}", volume_score, market.volume),
            ];
            if let Some(signal) = news.as_ref() {
                evidence.push(format!(
                    "news {} across {} articles",
                    signal.sentiment,
                    signal.articles.len()
                ));
                for article in signal.articles.iter().take(2) {
                    evidence.push(format!("headline: {}", utils::truncate(&article.title, 80)));
                }
            }
            if let Some(h) = hours {
                if h < WEEK_HOURS {
                    evidence.push(format!("resolves in {} hours", h.round_dp(1)));
                }
            }

            let predicted = if favors_this_side {
                blended
            } else {
                Decimal::ONE - blended
            };
            let risk = signal::risk_score(market.volume, hours, edge);

            opportunities.push(
                Opportunity::new(
                    market.id.clone(),
                    market.question.clone(),
                    target_outcome,
                    target_price,
                    predicted,
                    confidence,
                    edge * dec!(100) * confidence,
                    risk,
                    market.volume,
                    hours,
                )
                .with_evidence(evidence),
            );
        }
        opportunities
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
