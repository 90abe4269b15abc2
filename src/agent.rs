//! Decision loop
//!
//! Owns the iteration cycle: snapshot the market set, run the strategy
//! pass, push the ranked candidates through the risk gate, and execute or
//! paper-log the approvals. Any per-iteration failure is logged and the
//! loop continues; only shutdown or an iteration bound ends it.

use crate::aggregator;
use crate::client::{ClobClient, GammaClient};
use crate::config::Config;
use crate::error::Result;
use crate::risk::RiskManager;
use crate::strategy::Strategy;
use crate::types::{Opportunity, Position, PositionMap, Side};
use crate::utils;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Agent {
    config: Config,
    gamma: GammaClient,
    clob: ClobClient,
    strategies: Vec<Box<dyn Strategy>>,
    risk_manager: RiskManager,
    open_positions: PositionMap,
}

impl Agent {
    pub fn new(
        config: Config,
        gamma: GammaClient,
        clob: ClobClient,
        strategies: Vec<Box<dyn Strategy>>,
    ) -> Self {
        let risk_manager = RiskManager::new(config.trading.clone());
        Self {
            config,
            gamma,
            clob,
            strategies,
            risk_manager,
            open_positions: PositionMap::new(),
        }
    }

    /// Run until shutdown, or for `iterations` cycles when bounded. The
    /// iteration in flight always completes before the loop exits.
    pub async fn run(&mut self, iterations: Option<u64>) {
        let interval = Duration::from_secs(self.config.agent.check_interval_secs);
        info!(
            interval_secs = self.config.agent.check_interval_secs,
            paper_trading = self.config.agent.paper_trading,
            strategies = self.strategies.len(),
            "agent starting"
        );

        let mut iteration: u64 = 0;
        loop {
            iteration += 1;
            info!(iteration, "iteration starting");
            if let Err(e) = self.run_once().await {
                error!(error = %e, "iteration failed; continuing");
            }
            if let Some(max) = iterations {
                if iteration >= max {
                    break;
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }
        info!(iteration, "agent stopped");
    }

    /// One full cycle: snapshot, strategy pass, risk gate, execution.
    pub async fn run_once(&mut self) -> Result<()> {
        let markets = self
            .gamma
            .list_active_markets(self.config.agent.markets_limit, None)
            .await?;
        if markets.is_empty() {
            warn!("no active markets in snapshot");
            return Ok(());
        }
        info!(markets = markets.len(), "snapshot fetched");

        let candidates =
            aggregator::collect(&self.strategies, &markets, &self.open_positions).await;
        info!(candidates = candidates.len(), "unique trade candidates");

        let mut executed = 0usize;
        for opportunity in candidates
            .into_iter()
            .take(self.config.agent.top_candidates)
        {
            let decision = self.risk_manager.evaluate_opportunity(&opportunity);
            info!(
                market_id = %opportunity.market_id,
                outcome = %opportunity.outcome,
                price = %opportunity.current_price,
                expected_value = %opportunity.expected_value,
                final_confidence = %decision.final_confidence,
                risk = %decision.risk_score,
                size = %decision.position_size,
                approved = decision.should_trade,
                reasoning = %decision.reasoning,
                "risk decision"
            );
            if !decision.should_trade {
                continue;
            }
            if self.execute(&opportunity, decision.position_size).await {
                executed += 1;
                self.risk_manager.record_trade();
                let shares = if opportunity.current_price > Decimal::ZERO {
                    decision.position_size / opportunity.current_price
                } else {
                    Decimal::ZERO
                };
                self.open_positions.insert(
                    opportunity.market_id.clone(),
                    Position {
                        market_id: opportunity.market_id.clone(),
                        outcome: opportunity.outcome.clone(),
                        size: shares,
                    },
                );
            }
        }
        info!(executed, "iteration complete");
        Ok(())
    }

    async fn execute(&self, opportunity: &Opportunity, size: Decimal) -> bool {
        if self.config.agent.paper_trading {
            self.log_paper_trade(opportunity, size);
            return true;
        }
        let result = self
            .clob
            .place_order(
                &opportunity.market_id,
                Side::Buy,
                opportunity.current_price,
                size,
            )
            .await;
        if !result.success {
            warn!(
                market_id = %opportunity.market_id,
                message = %result.message,
                "order rejected"
            );
        }
        result.success
    }

    fn log_paper_trade(&self, opportunity: &Opportunity, size: Decimal) {
        let shares = if opportunity.current_price > Decimal::ZERO {
            size / opportunity.current_price
        } else {
            Decimal::ZERO
        };
        let potential_profit = shares * (Decimal::ONE - opportunity.current_price);
        info!(
            market = %utils::truncate(&opportunity.question, 60),
            outcome = %opportunity.outcome,
            price = %utils::fmt_pct(opportunity.current_price),
            cost = %size,
            shares = %shares.round_dp(2),
            potential_profit = %potential_profit.round_dp(2),
            "paper trade"
        );
        for line in opportunity.evidence.iter().take(5) {
            info!(evidence = %line, "paper trade evidence");
        }
    }

    /// Drop a tracked position and free its slot in the risk gate.
    pub fn close_position(&mut self, market_id: &str) {
        if self.open_positions.remove(market_id).is_some() {
            self.risk_manager.close_position();
            info!(market_id, "position removed");
        }
    }

    pub fn open_positions(&self) -> &PositionMap {
        &self.open_positions
    }
}
