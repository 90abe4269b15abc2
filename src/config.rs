//! Configuration
//!
//! Layered: a TOML file plus `AGENT__`-prefixed environment overrides.
//! Every field has a default so an empty file is a valid configuration;
//! credentials additionally fall back to the conventional env vars.

use crate::error::{AgentError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub trading: TradingConfig,
    pub threshold: ThresholdConfig,
    pub expiring: ExpiringConfig,
    pub fusion: FusionConfig,
    pub index: IndexConfig,
    pub news: NewsConfig,
    pub judge: JudgeConfig,
    pub polymarket: PolymarketConfig,
}

/// Decision-loop pacing and candidate selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Seconds between iterations
    pub check_interval_secs: u64,
    /// Markets fetched per snapshot
    pub markets_limit: usize,
    /// Candidates run through the risk gate per iteration
    pub top_candidates: usize,
    /// Log simulated fills instead of submitting orders
    pub paper_trading: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            markets_limit: 50,
            top_candidates: 10,
            paper_trading: true,
        }
    }
}

/// Risk-gate limits shared by all strategies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub max_position_size: Decimal,
    pub min_confidence: Decimal,
    pub max_daily_trades: u32,
    pub max_open_positions: u32,
    pub risk_limit_per_trade: Decimal,
    pub min_expected_value: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_position_size: dec!(100),
            min_confidence: dec!(0.7),
            max_daily_trades: 10,
            max_open_positions: 20,
            risk_limit_per_trade: dec!(50),
            min_expected_value: dec!(5),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub buy_threshold: Decimal,
    pub sell_threshold: Decimal,
    pub min_edge: Decimal,
    pub use_news: bool,
    /// Minimum judge-reported confidence for the model-assisted variant
    pub judge_confidence_floor: Decimal,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            buy_threshold: dec!(0.3),
            sell_threshold: dec!(0.7),
            min_edge: dec!(0.15),
            use_news: true,
            judge_confidence_floor: dec!(0.6),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ExpiringConfig {
    pub min_probability: Decimal,
    pub max_hours: Decimal,
    pub min_hours: Decimal,
    pub min_volume: Decimal,
    /// Minimum judge-reported confidence before the model-assisted variant
    /// trusts a judgment instead of falling back to the rule path
    pub judge_confidence_floor: Decimal,
}

impl Default for ExpiringConfig {
    fn default() -> Self {
        Self {
            min_probability: dec!(0.95),
            max_hours: dec!(48),
            min_hours: dec!(2),
            min_volume: dec!(10000),
            judge_confidence_floor: dec!(0.7),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct FusionConfig {
    pub min_edge: Decimal,
    pub min_volume: Decimal,
    pub price_weight: Decimal,
    pub volume_weight: Decimal,
    pub sentiment_weight: Decimal,
    pub min_confidence: Decimal,
    /// Top-K markets by volume considered per scan
    pub top_markets: usize,
    /// Ranked opportunities kept per scan
    pub max_results: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            min_edge: dec!(0.15),
            min_volume: dec!(50000),
            price_weight: dec!(0.4),
            volume_weight: dec!(0.3),
            sentiment_weight: dec!(0.3),
            min_confidence: dec!(0.7),
            top_markets: 50,
            max_results: 10,
        }
    }
}

/// Target allocation entry served by the config-backed index source
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AllocationConfig {
    pub market_id: String,
    pub outcome: String,
    pub target_shares: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub index_id: String,
    /// Relative deviation triggering a rebalance
    pub rebalance_threshold: Decimal,
    pub check_interval_mins: i64,
    // Allocation-driven trust constants; configurable rather than derived
    pub rebalance_confidence: Decimal,
    pub exit_confidence: Decimal,
    pub rebalance_risk: Decimal,
    pub exit_risk: Decimal,
    pub allocations: Vec<AllocationConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_id: String::new(),
            rebalance_threshold: dec!(0.05),
            check_interval_mins: 60,
            rebalance_confidence: dec!(0.90),
            exit_confidence: dec!(0.95),
            rebalance_risk: dec!(0.10),
            exit_risk: dec!(0.05),
            allocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_url: String,
    pub api_key: String,
    pub days_back: i64,
    pub page_size: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://newsapi.org/v2".to_string(),
            api_key: String::new(),
            days_back: 7,
            page_size: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "openai/gpt-3.5-turbo".to_string(),
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolymarketConfig {
    pub gamma_url: String,
    pub clob_url: String,
    pub private_key: String,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            gamma_url: "https://gamma-api.polymarket.com".to_string(),
            clob_url: "https://clob.polymarket.com".to_string(),
            private_key: String::new(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file layered under env overrides
    /// (`AGENT__TRADING__MAX_DAILY_TRADES=5` style). Credentials left
    /// empty by both layers fall back to the conventional env vars.
    pub fn load(path: &str) -> Result<Self> {
        let mut cfg: Config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("AGENT").separator("__"))
            .build()?
            .try_deserialize()?;

        if cfg.news.api_key.is_empty() {
            if let Ok(key) = std::env::var("NEWS_API_KEY") {
                cfg.news.api_key = key;
            }
        }
        if cfg.judge.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
                cfg.judge.api_key = key;
            }
        }
        if cfg.polymarket.private_key.is_empty() {
            if let Ok(key) = std::env::var("POLYMARKET_PRIVATE_KEY") {
                cfg.polymarket.private_key = key;
            }
        }

        Ok(cfg)
    }

    /// Startup validation. Failures here abort before the loop begins.
    pub fn validate(&self) -> Result<()> {
        if !self.agent.paper_trading && self.polymarket.private_key.is_empty() {
            return Err(AgentError::ConfigurationInvalid(
                "POLYMARKET_PRIVATE_KEY is required outside paper-trading mode".to_string(),
            ));
        }
        let weight_sum =
            self.fusion.price_weight + self.fusion.volume_weight + self.fusion.sentiment_weight;
        if weight_sum <= Decimal::ZERO {
            return Err(AgentError::ConfigurationInvalid(
                "fusion signal weights must sum to a positive value".to_string(),
            ));
        }
        if self.trading.min_confidence < Decimal::ZERO || self.trading.min_confidence > Decimal::ONE
        {
            return Err(AgentError::ConfigurationInvalid(
                "trading.min_confidence must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}
