//! Judgment capability
//!
//! Wraps an OpenRouter-style chat-completion endpoint behind the [`Judge`]
//! trait so model-assisted strategies can be exercised with mocks. Calls
//! carry a bounded timeout and a small bounded retry count; a response that
//! does not match the strict recommendation schema is a
//! [`AgentError::MalformedResponse`], never a crash.

use crate::error::{AgentError, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;

/// One judgment request
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl JudgeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 800,
            temperature: 0.3,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Abstract judgment capability (model-backed or rule-based)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Judge: Send + Sync {
    /// False when the capability is unavailable (e.g. no API key); a
    /// strategy that requires judgment deactivates itself in that case.
    fn is_enabled(&self) -> bool;

    /// Submit a prompt, returning the raw response text.
    async fn judge(&self, request: JudgeRequest) -> Result<String>;
}

/// Chat-completion backed judge
pub struct JudgeClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    content: String,
}

impl JudgeClient {
    pub fn new(cfg: &crate::config::JudgeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_retries: cfg.max_retries,
        })
    }

    async fn call_once(&self, request: &JudgeRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::ProviderUnavailable("judgment endpoint timed out".to_string())
                } else {
                    AgentError::ProviderUnavailable(format!("judgment endpoint: {e}"))
                }
            })?
            .error_for_status()
            .map_err(|e| AgentError::ProviderUnavailable(format!("judgment endpoint: {e}")))?;

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AgentError::MalformedResponse("empty completion choices".to_string()))
    }
}

#[async_trait]
impl Judge for JudgeClient {
    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn judge(&self, request: JudgeRequest) -> Result<String> {
        if !self.is_enabled() {
            return Err(AgentError::ProviderUnavailable(
                "judgment capability not configured".to_string(),
            ));
        }
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.call_once(&request).await {
                Ok(text) => {
                    debug!(attempt, "judgment call succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "judgment call failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            AgentError::ProviderUnavailable("judgment call failed".to_string())
        }))
    }
}

// ---- strict judgment schemas ----

/// Trade direction a judgment may recommend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JudgedOutcome {
    #[serde(rename = "YES", alias = "Yes", alias = "yes")]
    Yes,
    #[serde(rename = "NO", alias = "No", alias = "no")]
    No,
}

impl JudgedOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            JudgedOutcome::Yes => "YES",
            JudgedOutcome::No => "NO",
        }
    }
}

/// Only entries into a market are acted on; anything else is rejected at
/// parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JudgedAction {
    #[serde(rename = "BUY", alias = "Buy", alias = "buy")]
    Buy,
}

/// One recommendation inside a threshold judgment
#[derive(Debug, Clone, Deserialize)]
pub struct Recommendation {
    pub outcome: JudgedOutcome,
    pub action: JudgedAction,
    pub confidence: Decimal,
    pub predicted_probability: Decimal,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub key_factors: Vec<String>,
}

/// Judgment schema for the model-assisted threshold strategy
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdJudgment {
    pub should_trade: bool,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub overall_assessment: String,
}

/// Judgment schema for the model-assisted expiring-market strategy
#[derive(Debug, Clone, Deserialize)]
pub struct ExpiryJudgment {
    pub has_opportunity: bool,
    #[serde(default)]
    pub recommended_outcome: String,
    pub confidence: Decimal,
    pub expected_probability: Decimal,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub risk_factors: Vec<String>,
}

/// Extract and parse the JSON object embedded in a judgment response.
/// Models wrap their JSON in prose, so take the outermost brace span; any
/// deviation from the schema is a MalformedResponse.
pub fn parse_judgment<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let start = raw
        .find('{')
        .ok_or_else(|| AgentError::MalformedResponse("no JSON object in response".to_string()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| AgentError::MalformedResponse("no JSON object in response".to_string()))?;
    if end < start {
        return Err(AgentError::MalformedResponse(
            "no JSON object in response".to_string(),
        ));
    }
    serde_json::from_str(&raw[start..=end])
        .map_err(|e| AgentError::MalformedResponse(format!("judgment schema: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_threshold_judgment() {
        let raw = r#"Here is my analysis:
        {"should_trade": true, "recommendations": [
            {"outcome": "YES", "action": "BUY", "confidence": 0.75,
             "predicted_probability": 0.6, "reasoning": "underpriced",
             "key_factors": ["polls", "turnout"]}
        ], "overall_assessment": "mispriced"}
        Done."#;
        let j: ThresholdJudgment = parse_judgment(raw).unwrap();
        assert!(j.should_trade);
        assert_eq!(j.recommendations.len(), 1);
        assert_eq!(j.recommendations[0].outcome, JudgedOutcome::Yes);
        assert_eq!(j.recommendations[0].confidence, dec!(0.75));
    }

    #[test]
    fn test_parse_expiry_judgment() {
        let raw = r#"{"has_opportunity": true, "recommended_outcome": "YES",
            "confidence": 0.85, "expected_probability": 0.98,
            "reasoning": "already decided", "risk_factors": []}"#;
        let j: ExpiryJudgment = parse_judgment(raw).unwrap();
        assert!(j.has_opportunity);
        assert_eq!(j.expected_probability, dec!(0.98));
    }

    #[test]
    fn test_unknown_enum_value_is_malformed() {
        let raw = r#"{"should_trade": true, "recommendations": [
            {"outcome": "MAYBE", "action": "BUY", "confidence": 0.9,
             "predicted_probability": 0.5}]}"#;
        let err = parse_judgment::<ThresholdJudgment>(raw).unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }

    #[test]
    fn test_sell_action_is_malformed() {
        let raw = r#"{"should_trade": true, "recommendations": [
            {"outcome": "NO", "action": "SELL", "confidence": 0.9,
             "predicted_probability": 0.5}]}"#;
        assert!(parse_judgment::<ThresholdJudgment>(raw).is_err());
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let raw = r#"{"recommendations": []}"#;
        assert!(parse_judgment::<ThresholdJudgment>(raw).is_err());
    }

    #[test]
    fn test_no_json_at_all() {
        let err = parse_judgment::<ExpiryJudgment>("I cannot help with that").unwrap_err();
        assert!(matches!(err, AgentError::MalformedResponse(_)));
    }
}
