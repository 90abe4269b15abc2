//! Risk gate
//!
//! Final sizing and approval for ranked opportunities. Recomputes risk
//! from the opportunity's own fields rather than trusting the strategy's
//! score, discounts confidence by it, sizes with fractional Kelly, and
//! enforces the hard limits. Every rejection carries the full list of
//! failed conditions for the log.

use crate::config::TradingConfig;
use crate::signal;
use crate::types::Opportunity;
use crate::utils;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

const MAX_ACCEPTABLE_RISK: Decimal = dec!(0.5);

/// Outcome of one risk evaluation
#[derive(Debug, Clone)]
pub struct RiskDecision {
    pub should_trade: bool,
    /// Currency amount to deploy; zero on rejection
    pub position_size: Decimal,
    /// Strategy confidence discounted by recomputed risk
    pub final_confidence: Decimal,
    pub risk_score: Decimal,
    pub reasoning: String,
}

/// Stateful gate tracking daily and open-position counters. In-memory
/// only; counters reset on restart like the positions they guard.
pub struct RiskManager {
    limits: TradingConfig,
    daily_trades: u32,
    last_reset: NaiveDate,
    open_positions: u32,
}

impl RiskManager {
    pub fn new(limits: TradingConfig) -> Self {
        Self {
            limits,
            daily_trades: 0,
            last_reset: Utc::now().date_naive(),
            open_positions: 0,
        }
    }

    pub fn evaluate_opportunity(&mut self, opportunity: &Opportunity) -> RiskDecision {
        self.evaluate_at(opportunity, Utc::now().date_naive())
    }

    pub(crate) fn evaluate_at(
        &mut self,
        opportunity: &Opportunity,
        today: NaiveDate,
    ) -> RiskDecision {
        self.reset_daily_counter(today);

        let risk_score = signal::risk_score(
            opportunity.volume,
            opportunity.hours_to_expiry,
            opportunity.edge(),
        );
        let final_confidence = opportunity.confidence * (Decimal::ONE - risk_score);
        let position_size = signal::kelly_position_size(
            opportunity.edge(),
            opportunity.current_price,
            self.limits.max_position_size,
            self.limits.risk_limit_per_trade,
            signal::KELLY_CONSERVATIVE_FACTOR,
        );

        let mut failures = Vec::new();
        if final_confidence < self.limits.min_confidence {
            failures.push(format!(
                "insufficient confidence ({} < {})",
                utils::fmt_pct(final_confidence),
                utils::fmt_pct(self.limits.min_confidence),
            ));
        }
        if position_size <= Decimal::ZERO {
            failures.push("position size is zero".to_string());
        }
        if opportunity.expected_value <= self.limits.min_expected_value {
            failures.push(format!(
                "expected value too small ({} <= {})",
                opportunity.expected_value, self.limits.min_expected_value,
            ));
        }
        if risk_score >= MAX_ACCEPTABLE_RISK {
            failures.push(format!(
                "risk score too high ({} >= {})",
                risk_score, MAX_ACCEPTABLE_RISK,
            ));
        }
        if self.daily_trades >= self.limits.max_daily_trades {
            failures.push(format!(
                "daily trade limit reached ({}/{})",
                self.daily_trades, self.limits.max_daily_trades,
            ));
        }
        if self.open_positions >= self.limits.max_open_positions {
            failures.push(format!(
                "open position limit reached ({}/{})",
                self.open_positions, self.limits.max_open_positions,
            ));
        }

        if failures.is_empty() {
            RiskDecision {
                should_trade: true,
                position_size,
                final_confidence,
                risk_score,
                reasoning: format!(
                    "approved: confidence {}, expected value {}, risk {}, size ${}",
                    utils::fmt_pct(final_confidence),
                    opportunity.expected_value.round_dp(2),
                    utils::fmt_pct(risk_score),
                    position_size,
                ),
            }
        } else {
            RiskDecision {
                should_trade: false,
                position_size: Decimal::ZERO,
                final_confidence,
                risk_score,
                reasoning: format!("rejected: {}", failures.join("; ")),
            }
        }
    }

    /// One-way daily rollover; calling repeatedly within a day is a no-op.
    fn reset_daily_counter(&mut self, today: NaiveDate) {
        if today > self.last_reset {
            self.daily_trades = 0;
            self.last_reset = today;
            info!(%today, "daily trade counter reset");
        }
    }

    pub fn record_trade(&mut self) {
        self.daily_trades += 1;
        self.open_positions += 1;
        info!(
            daily_trades = self.daily_trades,
            open_positions = self.open_positions,
            "trade recorded"
        );
    }

    pub fn close_position(&mut self) {
        self.open_positions = self.open_positions.saturating_sub(1);
        info!(open_positions = self.open_positions, "position closed");
    }

    pub fn daily_trades(&self) -> u32 {
        self.daily_trades
    }

    pub fn open_positions(&self) -> u32 {
        self.open_positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn strong_opportunity() -> Opportunity {
        Opportunity::new(
            "m1",
            "test market",
            "YES",
            dec!(0.10),
            dec!(0.30),
            dec!(0.8),
            dec!(16),
            dec!(0.0),
            dec!(200000),
            Some(dec!(72)),
        )
    }

    #[test]
    fn test_accepts_strong_opportunity() {
        let mut manager = RiskManager::new(TradingConfig::default());
        let decision = manager.evaluate_opportunity(&strong_opportunity());
        assert!(decision.should_trade, "{}", decision.reasoning);
        // edge 0.2 / 0.9 * 0.25 * 100, floored
        assert_eq!(decision.position_size, dec!(5));
        assert_eq!(decision.final_confidence, dec!(0.8));
        assert!(decision.reasoning.starts_with("approved"));
    }

    #[test]
    fn test_rejects_low_confidence_and_names_it() {
        let mut manager = RiskManager::new(TradingConfig::default());
        let mut opportunity = strong_opportunity();
        opportunity.confidence = dec!(0.5);

        let decision = manager.evaluate_opportunity(&opportunity);
        assert!(!decision.should_trade);
        assert_eq!(decision.position_size, Decimal::ZERO);
        assert!(decision.reasoning.contains("insufficient confidence"));
    }

    #[test]
    fn test_risk_discounts_confidence() {
        let mut manager = RiskManager::new(TradingConfig::default());
        let mut opportunity = strong_opportunity();
        // Thin volume adds a 0.3 penalty on recompute
        opportunity.volume = dec!(1000);

        let decision = manager.evaluate_opportunity(&opportunity);
        assert_eq!(decision.risk_score, dec!(0.3));
        assert_eq!(decision.final_confidence, dec!(0.8) * dec!(0.7));
    }

    #[test]
    fn test_daily_limit_blocks_and_rolls_over() {
        let mut manager = RiskManager::new(TradingConfig {
            max_daily_trades: 2,
            ..TradingConfig::default()
        });
        manager.record_trade();
        manager.record_trade();

        let today = Utc::now().date_naive();
        let decision = manager.evaluate_at(&strong_opportunity(), today);
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("daily trade limit"));

        // Next day the counter resets, though open positions persist
        let tomorrow = today + Duration::days(1);
        let decision = manager.evaluate_at(&strong_opportunity(), tomorrow);
        assert_eq!(manager.daily_trades(), 0);
        assert_eq!(manager.open_positions(), 2);
        assert!(decision.should_trade, "{}", decision.reasoning);
    }

    #[test]
    fn test_rollover_is_one_way() {
        let mut manager = RiskManager::new(TradingConfig::default());
        manager.record_trade();
        let today = Utc::now().date_naive();

        // An out-of-order earlier date must not reset anything
        let yesterday = today - Duration::days(1);
        manager.evaluate_at(&strong_opportunity(), yesterday);
        assert_eq!(manager.daily_trades(), 1);
    }

    #[test]
    fn test_open_position_limit_blocks() {
        let mut manager = RiskManager::new(TradingConfig {
            max_open_positions: 1,
            ..TradingConfig::default()
        });
        manager.record_trade();

        let decision = manager.evaluate_opportunity(&strong_opportunity());
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("open position limit"));
    }

    #[test]
    fn test_close_position_never_underflows() {
        let mut manager = RiskManager::new(TradingConfig::default());
        manager.close_position();
        manager.close_position();
        assert_eq!(manager.open_positions(), 0);
    }

    #[test]
    fn test_rejects_small_expected_value() {
        let mut manager = RiskManager::new(TradingConfig::default());
        let mut opportunity = strong_opportunity();
        opportunity.expected_value = dec!(5);

        // Strictly-greater bound: exactly the minimum is still rejected
        let decision = manager.evaluate_opportunity(&opportunity);
        assert!(!decision.should_trade);
        assert!(decision.reasoning.contains("expected value too small"));
    }
}
