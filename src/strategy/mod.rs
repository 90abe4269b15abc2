//! Trading strategies
//!
//! Each variant implements the same capability set over one immutable
//! market snapshot; the aggregator iterates them uniformly. Variants are a
//! closed set selected at configuration time — no registry, no globals.

pub mod expiring;
pub mod fusion;
pub mod index;
pub mod llm_expiring;
pub mod llm_threshold;
pub mod threshold;

#[cfg(test)]
mod tests;

pub use expiring::ExpiringStrategy;
pub use fusion::FusionStrategy;
pub use index::IndexStrategy;
pub use llm_expiring::LlmExpiringStrategy;
pub use llm_threshold::LlmThresholdStrategy;
pub use threshold::ThresholdStrategy;

use crate::client::{IndexSource, Judge, NewsSource, StaticIndexSource};
use crate::config::Config;
use crate::error::Result;
use crate::types::{MarketSnapshot, Opportunity, PositionMap};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Common capability set every strategy variant implements.
///
/// Strategies are read-only with respect to the snapshot and position map;
/// they may be evaluated in any order without changing the aggregated
/// outcome (the aggregator imposes the total order).
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy participates in the current iteration. False
    /// when a required external capability is unavailable.
    fn is_active(&self) -> bool {
        true
    }

    /// Analyze a single market. Pure with respect to the strategy's own
    /// configuration; side-effect-free apart from logging.
    async fn analyze_market(&self, market: &MarketSnapshot) -> Vec<Opportunity>;

    /// Scan a snapshot, skipping markets already held. The default walks
    /// every market through `analyze_market`; fusion and index override.
    async fn find_opportunities(
        &self,
        markets: &[MarketSnapshot],
        open_positions: &PositionMap,
    ) -> Vec<Opportunity> {
        if !self.is_active() {
            return Vec::new();
        }
        let mut opportunities = Vec::new();
        for market in markets {
            if open_positions.contains_key(&market.id) {
                debug!(market_id = %market.id, "skipping held market");
                continue;
            }
            opportunities.extend(self.analyze_market(market).await);
        }
        opportunities
    }

    /// Merge a JSON-object patch over the strategy's options. New keys
    /// win; omitted keys keep their current values.
    fn update_config(&mut self, patch: &serde_json::Value) -> Result<()>;
}

/// Merge a patch object over serialized options and re-deserialize.
pub(crate) fn merge_options<T>(current: &T, patch: &serde_json::Value) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut base = serde_json::to_value(current)?;
    if let (Some(base_map), Some(patch_map)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_map {
            base_map.insert(key.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(base)?)
}

/// Strategy selection, chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Threshold,
    LlmThreshold,
    Expiring,
    LlmExpiring,
    Fusion,
    Index,
    All,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "threshold" => Ok(Self::Threshold),
            "llm-threshold" => Ok(Self::LlmThreshold),
            "expiring" => Ok(Self::Expiring),
            "llm-expiring" => Ok(Self::LlmExpiring),
            "fusion" => Ok(Self::Fusion),
            "index" => Ok(Self::Index),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown strategy '{other}' (expected threshold, llm-threshold, expiring, \
                 llm-expiring, fusion, index, or all)"
            )),
        }
    }
}

/// Build the active strategy set for one run. Collaborators are owned,
/// explicitly constructed instances shared by reference counting.
pub fn build_strategies(
    kind: StrategyKind,
    config: &Config,
    news: Option<Arc<dyn NewsSource>>,
    judge: Option<Arc<dyn Judge>>,
) -> Vec<Box<dyn Strategy>> {
    let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
    let all = kind == StrategyKind::All;

    if all || kind == StrategyKind::Threshold {
        strategies.push(Box::new(ThresholdStrategy::new(
            config.threshold.clone(),
            news.clone(),
        )));
    }
    if all || kind == StrategyKind::LlmThreshold {
        strategies.push(Box::new(LlmThresholdStrategy::new(
            config.threshold.clone(),
            news.clone(),
            judge.clone(),
        )));
    }
    if all || kind == StrategyKind::Expiring {
        strategies.push(Box::new(ExpiringStrategy::new(config.expiring.clone())));
    }
    if all || kind == StrategyKind::LlmExpiring {
        strategies.push(Box::new(LlmExpiringStrategy::new(
            config.expiring.clone(),
            judge.clone(),
        )));
    }
    if all || kind == StrategyKind::Fusion {
        strategies.push(Box::new(FusionStrategy::new(config.fusion.clone(), news)));
    }
    if all || kind == StrategyKind::Index {
        let source: Option<Arc<dyn IndexSource>> = if config.index.index_id.is_empty() {
            None
        } else {
            Some(Arc::new(StaticIndexSource::from_config(&config.index)))
        };
        strategies.push(Box::new(IndexStrategy::new(config.index.clone(), source)));
    }

    strategies
}
