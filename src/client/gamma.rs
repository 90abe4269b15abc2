//! Gamma API client for market data
//!
//! Fetches market listings and normalizes the inconsistent wire shape into
//! [`MarketSnapshot`]: prices resolve through a fallback chain (explicit
//! outcome prices, market-maker blob, bid/ask midpoint, uniform default)
//! and volume coerces to a non-negative number.

use crate::error::Result;
use crate::types::MarketSnapshot;
use crate::utils;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

/// Gamma API client
#[derive(Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GammaMarket {
    id: Option<String>,
    #[serde(rename = "conditionId")]
    condition_id: Option<String>,
    question: Option<String>,
    description: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    volume: Option<serde_json::Value>,
    outcomes: Option<String>, // JSON string, e.g. "[\"Yes\", \"No\"]"
    #[serde(rename = "outcomePrices")]
    outcome_prices: Option<String>, // JSON string, e.g. "[\"0.55\", \"0.45\"]"
    #[serde(rename = "marketMakerData")]
    market_maker_data: Option<String>, // JSON blob with a "prices" array
    #[serde(rename = "bestBid")]
    best_bid: Option<serde_json::Value>,
    #[serde(rename = "bestAsk")]
    best_ask: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MarketMakerData {
    #[serde(default)]
    prices: Vec<serde_json::Value>,
}

impl GammaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// List active markets, most-traded first, optionally filtered by a
    /// volume floor.
    pub async fn list_active_markets(
        &self,
        limit: usize,
        min_volume: Option<Decimal>,
    ) -> Result<Vec<MarketSnapshot>> {
        let url = format!("{}/markets", self.base_url);
        let resp: Vec<GammaMarket> = self
            .http
            .get(&url)
            .query(&[
                ("active", "true"),
                ("closed", "false"),
                ("order", "volume"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut markets: Vec<MarketSnapshot> = resp.into_iter().map(parse_market).collect();
        if let Some(floor) = min_volume {
            markets.retain(|m| m.volume >= floor);
        }
        debug!(count = markets.len(), "fetched active markets");
        Ok(markets)
    }

    /// Look up a single market by its condition id.
    pub async fn get_market_by_id(&self, market_id: &str) -> Result<Option<MarketSnapshot>> {
        let url = format!("{}/markets", self.base_url);
        let resp: Vec<GammaMarket> = self
            .http
            .get(&url)
            .query(&[("condition_ids", market_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.into_iter().next().map(parse_market))
    }
}

/// Normalize one raw Gamma market. Infallible: missing or malformed fields
/// degrade to defaults instead of dropping the market.
pub(crate) fn parse_market(gm: GammaMarket) -> MarketSnapshot {
    let prices = extract_prices(&gm);
    let outcomes: Vec<String> = gm
        .outcomes
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_else(|| vec!["Yes".to_string(), "No".to_string()]);

    let volume = match &gm.volume {
        Some(serde_json::Value::String(s)) => utils::coerce_volume(Some(s)),
        Some(v) => value_to_decimal(v)
            .filter(|d| *d >= Decimal::ZERO)
            .unwrap_or(Decimal::ZERO),
        None => Decimal::ZERO,
    };

    MarketSnapshot {
        id: gm.condition_id.or(gm.id).unwrap_or_default(),
        question: gm.question.unwrap_or_default(),
        description: gm.description,
        outcomes,
        prices,
        volume,
        end_date: gm.end_date.as_deref().and_then(utils::parse_end_date),
    }
}

/// Price extraction fallback chain: outcomePrices, then the market-maker
/// blob, then the bid/ask midpoint, else a uniform 0.5 default.
fn extract_prices(gm: &GammaMarket) -> Vec<Decimal> {
    if let Some(raw) = gm.outcome_prices.as_deref() {
        if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            let parsed: Vec<Decimal> = values.iter().filter_map(value_to_decimal).collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }

    if let Some(raw) = gm.market_maker_data.as_deref() {
        if let Ok(mm) = serde_json::from_str::<MarketMakerData>(raw) {
            let parsed: Vec<Decimal> = mm.prices.iter().filter_map(value_to_decimal).collect();
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }

    if let (Some(bid), Some(ask)) = (gm.best_bid.as_ref(), gm.best_ask.as_ref()) {
        if let (Some(bid), Some(ask)) = (value_to_decimal(bid), value_to_decimal(ask)) {
            return vec![(bid + ask) / dec!(2)];
        }
    }

    vec![dec!(0.5)]
}

/// The API mixes numeric and stringified numbers in the same fields.
fn value_to_decimal(v: &serde_json::Value) -> Option<Decimal> {
    match v {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        _ => None,
    }
}
