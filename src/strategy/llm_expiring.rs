//! Model-assisted expiring-market strategy
//!
//! Applies the same expiry-window and volume eligibility as the rule-based
//! variant, then asks the judgment provider whether the near-certain read
//! holds up. Unlike the threshold variant this one degrades gracefully:
//! whenever the judged path produces nothing (provider failure, malformed
//! response, low confidence, no positive margin) the rule path runs
//! instead.

use super::expiring::{eligibility, rule_scan};
use super::{merge_options, Strategy};
use crate::client::judge::{parse_judgment, ExpiryJudgment, Judge, JudgeRequest};
use crate::config::ExpiringConfig;
use crate::error::{AgentError, Result};
use crate::types::{MarketSnapshot, Opportunity};
use crate::utils;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a prediction-market analyst specializing in markets close \
to resolution. Respond with a single JSON object and no surrounding prose.";
const JUDGE_TEMPERATURE: f32 = 0.2;

const VOLUME_RISK_FLOOR: Decimal = dec!(50000);
const VOLUME_RISK: Decimal = dec!(0.2);
const TIME_RISK_CAP: Decimal = dec!(0.3);

pub struct LlmExpiringStrategy {
    options: ExpiringConfig,
    judge: Option<Arc<dyn Judge>>,
}

impl LlmExpiringStrategy {
    pub fn new(options: ExpiringConfig, judge: Option<Arc<dyn Judge>>) -> Self {
        Self { options, judge }
    }

    fn build_prompt(&self, market: &MarketSnapshot, hours: Decimal) -> String {
        let mut prompt = format!(
            "This prediction market resolves in {} hours.\n\nQuestion: {}\n",
            hours.round_dp(1),
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
        prompt.push_str(
            "\nIs one outcome effectively decided, making its price a near-certain payoff? \
             Consider whether anything could still change before resolution.\n\n\
             Respond with JSON: {\"has_opportunity\": bool, \"recommended_outcome\": str, \
             \"confidence\": 0.0-1.0, \"expected_probability\": 0.0-1.0, \"reasoning\": str, \
             \"risk_factors\": [str]}",
        );
        prompt
    }

    /// Judged path. Any `Err` sends the caller to the rule path.
    async fn judged_scan(
        &self,
        judge: &Arc<dyn Judge>,
        market: &MarketSnapshot,
        hours: Decimal,
    ) -> Result<Vec<Opportunity>> {
        let request = JudgeRequest::new(self.build_prompt(market, hours))
            .with_system(SYSTEM_PROMPT)
            .with_temperature(JUDGE_TEMPERATURE);
        let raw = judge.judge(request).await?;
        let judgment: ExpiryJudgment = parse_judgment(&raw)?;

        if !judgment.has_opportunity {
            debug!(market_id = %market.id, "judge sees no expiry opportunity");
            return Ok(Vec::new());
        }
        if judgment.confidence < self.options.judge_confidence_floor {
            return Err(AgentError::MalformedResponse(format!(
                "judged confidence {} below floor {}",
                judgment.confidence, self.options.judge_confidence_floor
            )));
        }
        let label = judgment.recommended_outcome.to_uppercase();
        let Some(price) = market.price_for_outcome(&label) else {
            return Err(AgentError::MalformedResponse(format!(
                "judged outcome '{}' is not traded here",
                judgment.recommended_outcome
            )));
        };
        let margin = judgment.expected_probability - price;
        if margin <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(AgentError::MalformedResponse(
                "judged probability offers no margin over price".to_string(),
            ));
        }

        // Four equally weighted residual risks: the other side, the time
        // left, thin volume, and the judge's own uncertainty.
        let price_risk = Decimal::ONE - judgment.expected_probability;
        let time_risk = (hours / self.options.max_hours).min(TIME_RISK_CAP);
        let volume_risk = if market.volume < VOLUME_RISK_FLOOR {
            VOLUME_RISK
        } else {
            Decimal::ZERO
        };
        let judge_risk = Decimal::ONE - judgment.confidence;
        let risk = (price_risk + time_risk + volume_risk + judge_risk) / dec!(4);

        let expected_value = margin / price * dec!(100);

        let mut evidence = vec![format!(
            "judge sees {} resolving {} (priced {})",
            label,
            utils::fmt_pct(judgment.expected_probability),
            utils::fmt_pct(price),
        )];
        if !judgment.reasoning.is_empty() {
            evidence.push(utils::truncate(&judgment.reasoning, 200));
        }
        for factor in judgment.risk_factors.iter().take(3) {
            evidence.push(format!("risk: {}", utils::truncate(factor, 100)));
        }

        Ok(vec![Opportunity::new(
            market.id.clone(),
            market.question.clone(),
            label,
            price,
            judgment.expected_probability,
            judgment.confidence,
            expected_value,
            risk,
            market.volume,
            Some(hours),
        )
        .with_evidence(evidence)])
    }
}

#[async_trait]
impl Strategy for LlmExpiringStrategy {
    fn name(&self) -> &'static str {
        "llm-expiring"
    }

    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity> {
        let Some(hours) = eligibility(&self.options, market) else {
            return Vec::new();
        };

        if let Some(judge) = self.judge.as_ref().filter(|j| j.is_enabled()) {
            match self.judged_scan(judge, market, hours).await {
                Ok(opportunities) if !opportunities.is_empty() => return opportunities,
                Ok(_) => {}
                Err(error) => {
                    warn!(market_id = %market.id, %error, "judged path failed, using rules");
                }
            }
        }

        rule_scan(&self.options, market, hours)
    }

    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()> {
        self.options = merge_options(&self.options, patch)?;
        Ok(())
    }
}
