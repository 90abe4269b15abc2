//! Index-status provider
//!
//! Supplies the target allocation set the index-rebalancing strategy
//! aligns the portfolio against. Modeled as a trait with an explicitly
//! constructed, owned source injected at startup; the shipped
//! implementation serves allocations straight from configuration.

use crate::config::IndexConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One target allocation entry
#[derive(Debug, Clone)]
pub struct IndexAllocation {
    pub market_id: String,
    pub outcome: String,
    pub target_shares: Decimal,
    pub weight: Decimal,
}

/// Target state of the tracked index
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub index_id: String,
    pub target_allocations: Vec<IndexAllocation>,
    pub last_updated: DateTime<Utc>,
}

/// Abstract index-status capability
#[async_trait]
pub trait IndexSource: Send + Sync {
    async fn index_status(&self) -> Result<IndexStatus>;
}

/// Config-backed index source
pub struct StaticIndexSource {
    status: IndexStatus,
}

impl StaticIndexSource {
    pub fn from_config(cfg: &IndexConfig) -> Self {
        let target_allocations = cfg
            .allocations
            .iter()
            .map(|a| IndexAllocation {
                market_id: a.market_id.clone(),
                outcome: a.outcome.clone(),
                target_shares: a.target_shares,
                weight: a.weight,
            })
            .collect();
        Self {
            status: IndexStatus {
                index_id: cfg.index_id.clone(),
                target_allocations,
                last_updated: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl IndexSource for StaticIndexSource {
    async fn index_status(&self) -> Result<IndexStatus> {
        Ok(self.status.clone())
    }
}
