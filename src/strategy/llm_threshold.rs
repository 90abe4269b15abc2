//! Model-assisted threshold strategy
//!
//! Same entry thresholds as the rule-based variant, but the final call is
//! delegated to a judgment provider fed market context and recent news.
//! Every accepted recommendation is re-verified against live prices: the
//! judged edge must clear the configured minimum and the reported
//! confidence the configured floor. There is no fallback; a failed or
//! malformed judgment yields no opportunities for that market.

use super::{merge_options, Strategy};
use crate::client::judge::{parse_judgment, Judge, JudgeRequest, ThresholdJudgment};
use crate::client::news::{NewsSignal, NewsSource};
use crate::config::ThresholdConfig;
use crate::error::Result;
use crate::signal;
use crate::types::{MarketSnapshot, Opportunity};
use crate::utils;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a prediction-market analyst. Respond with a single JSON \
object and no surrounding prose.";

pub struct LlmThresholdStrategy {
    options: ThresholdConfig,
    news: Option<Arc<dyn NewsSource>>,
    judge: Option<Arc<dyn Judge>>,
}

impl LlmThresholdStrategy {
    pub fn new(
        options: ThresholdConfig,
        news: Option<Arc<dyn NewsSource>>,
        judge: Option<Arc<dyn Judge>>,
    ) -> Self {
        Self {
            options,
            news,
            judge,
        }
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
                warn!(market_id = %market.id, %error, "news lookup failed");
                None
            }
        }
    }

    fn build_prompt(&self, market: &MarketSnapshot, news: Option<&NewsSignal>) -> String {
        let mut prompt = format!(
            "Assess this prediction market for a threshold entry.\n\n\
             Question: {}\n",
            market.question
        );
        if let Some(description) = &market.description {
            prompt.push_str(&format!("Context: {}\n", utils::truncate(description, 400)));
        }
        prompt.push_str("Current prices:\n");
        for (outcome, price) in market.outcomes.iter().zip(&market.prices) {
            prompt.push_str(&format!("  {outcome}: {price}\n"));
        }
        prompt.push_str(&format!("24h volume: {}\n", market.volume));
        if let Some(end) = market.end_date {
            prompt.push_str(&format!("Resolves: {}\n", end.to_rfc3339()));
        }
        if let Some(signal) = news {
            prompt.push_str(&format!(
                "Recent news sentiment: {} ({} articles)\n",
                signal.sentiment,
                signal.articles.len()
            ));
            for article in signal.articles.iter().take(3) {
                prompt.push_str(&format!("  - {}\n", utils::truncate(&article.title, 100)));
            }
        }
        prompt.push_str(&format!(
            "\nEntry rules: buy below {}, consider the complement when YES trades above {}. \
             Only recommend a trade when your predicted probability differs from the price by \
             at least {}.\n\n\
             Respond with JSON: {{\"should_trade\": bool, \"recommendations\": [{{\"outcome\": \
             \"YES\"|\"NO\", \"action\": \"BUY\", \"confidence\": 0.0-1.0, \
             \"predicted_probability\": 0.0-1.0, \"reasoning\": str, \"key_factors\": [str]}}], \
             \"overall_assessment\": str}}",
            self.options.buy_threshold, self.options.sell_threshold, self.options.min_edge,
        ));
        prompt
    }

    fn opportunities_from(
        &self,
        market: &MarketSnapshot,
        judgment: ThresholdJudgment,
        news: Option<&NewsSignal>,
    ) -> Vec<Opportunity> {
        if !judgment.should_trade {
            debug!(market_id = %market.id, "judge declined to trade");
            return Vec::new();
        }

        let mut opportunities = Vec::new();
        for rec in judgment.recommendations {
            if rec.confidence < self.options.judge_confidence_floor {
                debug!(
                    market_id = %market.id,
                    confidence = %rec.confidence,
                    "judged confidence below floor"
                );
                continue;
            }
            let label = rec.outcome.as_label();
            let Some(price) = market.price_for_outcome(label) else {
                debug!(market_id = %market.id, outcome = label, "no price for judged outcome");
                continue;
            };
            let edge = (rec.predicted_probability - price).abs();
            if edge < self.options.min_edge {
                debug!(market_id = %market.id, %edge, "judged edge below minimum");
                continue;
            }

            let mut evidence = vec![format!(
                "judge recommends {} at {} (predicted {})",
                label,
                utils::fmt_pct(price),
                utils::fmt_pct(rec.predicted_probability),
            )];
            if !rec.reasoning.is_empty() {
                evidence.push(utils::truncate(&rec.reasoning, 200));
            }
            for factor in rec.key_factors.iter().take(3) {
                evidence.push(format!("factor: {}", utils::truncate(factor, 100)));
            }
            if let Some(signal) = news {
                evidence.push(format!(
                    "news {} across {} articles",
                    signal.sentiment,
                    signal.articles.len()
                ));
            }

            let hours = market.hours_to_expiry(Utc::now());
            let risk = signal::risk_score(market.volume, hours, edge);
            let expected_value = edge * dec!(100) * rec.confidence;

            opportunities.push(
                Opportunity::new(
                    market.id.clone(),
                    market.question.clone(),
                    label,
                    price,
                    rec.predicted_probability,
                    rec.confidence,
                    expected_value,
                    risk,
                    market.volume,
                    hours,
                )
                .with_evidence(evidence),
            );
        }
        opportunities
    }
}

#[async_trait]
impl Strategy for LlmThresholdStrategy {
    fn name(&self) -> &'static str {
        "llm-threshold"
    }

    fn is_active(&self) -> bool {
        self.judge.as_ref().map(|j| j.is_enabled()).unwrap_or(false)
    }

    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity> {
        let Some(judge) = self.judge.as_ref().filter(|j| j.is_enabled()) else {
            return Vec::new();
        };

        let news = self.news_signal(market).await;
        let request = JudgeRequest::new(self.build_prompt(market, news.as_ref()))
            .with_system(SYSTEM_PROMPT);

        let raw = match judge.judge(request).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(market_id = %market.id, %error, "judgment failed, skipping market");
                return Vec::new();
            }
        };
        let judgment: ThresholdJudgment = match parse_judgment(&raw) {
            Ok(judgment) => judgment,
            Err(error) => {
                warn!(market_id = %market.id, %error, "discarding malformed judgment");
                return Vec::new();
            }
        };

        self.opportunities_from(market, judgment, news.as_ref())
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
