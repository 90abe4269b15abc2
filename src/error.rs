//! Error types for the trading agent

use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum AgentError {
    /// An external provider (market data, news, judgment) is unreachable
    /// or timed out. Strategies treat this as "no signal".
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider answered, but the payload does not match the expected
    /// schema. Judgment-dependent strategies fall back or discard.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Fatal at startup, before the decision loop begins.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    #[error("market not found: {0}")]
    MarketNotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
