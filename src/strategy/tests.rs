use super::*;
use crate::client::index::StaticIndexSource;
use crate::client::judge::MockJudge;
use crate::config::{AllocationConfig, ExpiringConfig, FusionConfig, IndexConfig, ThresholdConfig};
use crate::types::{MarketSnapshot, Position, PositionMap};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;

fn make_market(id: &str, yes_price: Decimal, volume: Decimal) -> MarketSnapshot {
    MarketSnapshot {
        id: id.to_string(),
        question: format!("Will {id} resolve YES?"),
        description: None,
        outcomes: vec!["Yes".to_string(), "No".to_string()],
        prices: vec![yes_price, Decimal::ONE - yes_price],
        volume,
        end_date: None,
    }
}

fn expiring_market(id: &str, yes_price: Decimal, volume: Decimal, hours: i64) -> MarketSnapshot {
    let mut market = make_market(id, yes_price, volume);
    market.end_date = Some(Utc::now() + Duration::hours(hours));
    market
}

// ---- threshold ----

#[tokio::test]
async fn test_threshold_buys_cheap_outcome() {
    let strategy = ThresholdStrategy::new(ThresholdConfig::default(), None);
    let market = make_market("m1", dec!(0.10), dec!(200000));

    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "YES");
    assert_eq!(opp.current_price, dec!(0.10));
    // edge is the gap to the buy threshold, carried into the prediction
    assert_eq!(opp.edge(), dec!(0.20));
    assert_eq!(opp.predicted_probability, dec!(0.30));
    // edge * 100 * base confidence
    assert_eq!(opp.expected_value, dec!(16.0));
    assert!(!opp.evidence.is_empty());
}

#[tokio::test]
async fn test_threshold_proposes_complement_of_rich_yes() {
    let strategy = ThresholdStrategy::new(ThresholdConfig::default(), None);
    let market = make_market("m1", dec!(0.92), dec!(200000));

    let opportunities = strategy.analyze_market(&market).await;
    // One from the NO side being cheap directly, one from the rich YES
    assert!(opportunities.iter().any(|o| o.outcome == "NO"));
    for opp in &opportunities {
        assert_eq!(opp.outcome, "NO");
        assert_eq!(opp.current_price, dec!(0.08));
    }
}

#[tokio::test]
async fn test_threshold_requires_minimum_edge() {
    let strategy = ThresholdStrategy::new(ThresholdConfig::default(), None);
    // 0.25 is below the buy threshold but the 0.05 gap is under min_edge
    let market = make_market("m1", dec!(0.25), dec!(200000));
    assert!(strategy.analyze_market(&market).await.is_empty());
}

#[tokio::test]
async fn test_default_scan_skips_held_markets() {
    let strategy = ThresholdStrategy::new(ThresholdConfig::default(), None);
    let markets = vec![
        make_market("held", dec!(0.10), dec!(200000)),
        make_market("free", dec!(0.10), dec!(200000)),
    ];
    let mut positions = PositionMap::new();
    positions.insert(
        "held".to_string(),
        Position {
            market_id: "held".to_string(),
            outcome: "YES".to_string(),
            size: dec!(10),
        },
    );

    let opportunities = strategy.find_opportunities(&markets, &positions).await;
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].market_id, "free");
}

#[tokio::test]
async fn test_update_config_merges_partial_patch() {
    let mut strategy = ThresholdStrategy::new(ThresholdConfig::default(), None);
    let market = make_market("m1", dec!(0.22), dec!(200000));
    // 0.30 - 0.22 = 0.08, under the default min_edge
    assert!(strategy.analyze_market(&market).await.is_empty());

    strategy
        .update_config(&json!({ "buy_threshold": 0.4 }))
        .unwrap();
    // 0.40 - 0.22 = 0.18 now clears it; untouched keys keep defaults
    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].edge(), dec!(0.18));
}

// ---- expiring ----

#[tokio::test]
async fn test_expiring_flags_near_certain_outcome() {
    let strategy = ExpiringStrategy::new(ExpiringConfig::default());
    let market = expiring_market("m1", dec!(0.97), dec!(50000), 10);

    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "YES");
    assert_eq!(opp.predicted_probability, dec!(0.99));
    // residual margin of 3 cents, percentage scale
    assert_eq!(opp.expected_value, dec!(3.00));
    assert_eq!(opp.risk_score, dec!(0.03));
    assert!(opp.confidence <= dec!(0.95));
}

#[tokio::test]
async fn test_expiring_rejects_thin_volume_before_price() {
    let strategy = ExpiringStrategy::new(ExpiringConfig::default());
    // Near-certain price, but volume under the 10k floor
    let market = expiring_market("m1", dec!(0.97), dec!(5000), 10);
    assert!(strategy.analyze_market(&market).await.is_empty());
}

#[tokio::test]
async fn test_expiring_rejects_outside_window() {
    let strategy = ExpiringStrategy::new(ExpiringConfig::default());
    assert!(strategy
        .analyze_market(&expiring_market("m1", dec!(0.97), dec!(50000), 60))
        .await
        .is_empty());
    assert!(strategy
        .analyze_market(&expiring_market("m1", dec!(0.97), dec!(50000), 1))
        .await
        .is_empty());
    // No end date at all
    assert!(strategy
        .analyze_market(&make_market("m1", dec!(0.97), dec!(50000)))
        .await
        .is_empty());
}

// ---- llm variants ----

#[tokio::test]
async fn test_llm_expiring_falls_back_to_rules_on_judge_failure() {
    let mut judge = MockJudge::new();
    judge.expect_is_enabled().return_const(true);
    judge.expect_judge().returning(|_| {
        Err(crate::error::AgentError::ProviderUnavailable(
            "judge: timed out".to_string(),
        ))
    });

    let strategy = LlmExpiringStrategy::new(ExpiringConfig::default(), Some(Arc::new(judge)));
    let market = expiring_market("m1", dec!(0.97), dec!(50000), 10);

    // The rule path still produces the near-certain read
    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].predicted_probability, dec!(0.99));
}

#[tokio::test]
async fn test_llm_expiring_accepts_confident_judgment() {
    let mut judge = MockJudge::new();
    judge.expect_is_enabled().return_const(true);
    judge.expect_judge().returning(|_| {
        Ok(r#"{"has_opportunity": true, "recommended_outcome": "YES",
               "confidence": 0.9, "expected_probability": 0.99,
               "reasoning": "effectively decided", "risk_factors": []}"#
            .to_string())
    });

    let strategy = LlmExpiringStrategy::new(ExpiringConfig::default(), Some(Arc::new(judge)));
    let market = expiring_market("m1", dec!(0.96), dec!(60000), 10);

    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "YES");
    assert_eq!(opp.confidence, dec!(0.9));
    assert_eq!(opp.predicted_probability, dec!(0.99));
    // margin / price, percentage scale: 0.03 / 0.96 * 100
    assert_eq!(opp.expected_value, dec!(3.125));
}

#[tokio::test]
async fn test_llm_expiring_low_confidence_falls_back() {
    let mut judge = MockJudge::new();
    judge.expect_is_enabled().return_const(true);
    judge.expect_judge().returning(|_| {
        Ok(r#"{"has_opportunity": true, "recommended_outcome": "YES",
               "confidence": 0.4, "expected_probability": 0.99}"#
            .to_string())
    });

    let strategy = LlmExpiringStrategy::new(ExpiringConfig::default(), Some(Arc::new(judge)));
    let market = expiring_market("m1", dec!(0.97), dec!(50000), 10);

    let opportunities = strategy.analyze_market(&market).await;
    // Rule path output, not the judged one
    assert_eq!(opportunities.len(), 1);
    assert_eq!(opportunities[0].predicted_probability, dec!(0.99));
}

#[tokio::test]
async fn test_llm_threshold_discards_malformed_judgment() {
    let mut judge = MockJudge::new();
    judge.expect_is_enabled().return_const(true);
    judge
        .expect_judge()
        .returning(|_| Ok("I would not trade this market.".to_string()));

    let strategy =
        LlmThresholdStrategy::new(ThresholdConfig::default(), None, Some(Arc::new(judge)));
    let market = make_market("m1", dec!(0.10), dec!(200000));

    // No fallback for this variant
    assert!(strategy.analyze_market(&market).await.is_empty());
}

#[tokio::test]
async fn test_llm_threshold_reverifies_edge_against_live_price() {
    let mut judge = MockJudge::new();
    judge.expect_is_enabled().return_const(true);
    judge.expect_judge().returning(|_| {
        Ok(r#"{"should_trade": true, "recommendations": [
               {"outcome": "YES", "action": "BUY", "confidence": 0.8,
                "predicted_probability": 0.45, "reasoning": "", "key_factors": []},
               {"outcome": "NO", "action": "BUY", "confidence": 0.8,
                "predicted_probability": 0.65, "reasoning": "", "key_factors": []}],
               "overall_assessment": ""}"#
            .to_string())
    });

    let strategy =
        LlmThresholdStrategy::new(ThresholdConfig::default(), None, Some(Arc::new(judge)));
    // YES at 0.40: judged 0.45 gives only 0.05 edge. NO at 0.60: judged
    // 0.65 gives 0.05 too. Neither clears min_edge.
    let market = make_market("m1", dec!(0.40), dec!(200000));
    assert!(strategy.analyze_market(&market).await.is_empty());
}

#[tokio::test]
async fn test_llm_threshold_inactive_without_judge() {
    let strategy = LlmThresholdStrategy::new(ThresholdConfig::default(), None, None);
    assert!(!strategy.is_active());
    let markets = vec![make_market("m1", dec!(0.10), dec!(200000))];
    assert!(strategy
        .find_opportunities(&markets, &PositionMap::new())
        .await
        .is_empty());
}

// ---- fusion ----

#[tokio::test]
async fn test_fusion_blends_signals_and_backs_cheap_side() {
    let strategy = FusionStrategy::new(FusionConfig::default(), None);
    let market = make_market("m1", dec!(0.10), dec!(2000000));

    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "YES");
    // 0.8*0.4 + 0.9*0.3 + 0.5*0.3 = 0.74
    assert_eq!(opp.predicted_probability, dec!(0.74));
    assert!(opp.confidence >= dec!(0.7));
}

#[tokio::test]
async fn test_fusion_flips_to_complement_when_blend_is_bearish() {
    let options = FusionConfig {
        price_weight: dec!(1),
        volume_weight: dec!(0),
        sentiment_weight: dec!(0),
        ..FusionConfig::default()
    };
    let strategy = FusionStrategy::new(options, None);
    let mut market = make_market("m1", dec!(0.90), dec!(2000000));
    // Only the YES side carries a price
    market.outcomes.truncate(1);
    market.prices.truncate(1);

    let opportunities = strategy.analyze_market(&market).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "NO");
    assert_eq!(opp.current_price, dec!(0.10));
    assert_eq!(opp.predicted_probability, dec!(0.80));
}

#[tokio::test]
async fn test_fusion_scan_is_bounded_and_ranked() {
    let options = FusionConfig {
        max_results: 2,
        ..FusionConfig::default()
    };
    let strategy = FusionStrategy::new(options, None);
    let markets = vec![
        make_market("m1", dec!(0.10), dec!(2000000)),
        make_market("m2", dec!(0.10), dec!(2000000)),
        make_market("m3", dec!(0.10), dec!(2000000)),
    ];

    let opportunities = strategy
        .find_opportunities(&markets, &PositionMap::new())
        .await;
    assert_eq!(opportunities.len(), 2);
}

#[tokio::test]
async fn test_fusion_ignores_thin_markets() {
    let strategy = FusionStrategy::new(FusionConfig::default(), None);
    let markets = vec![make_market("m1", dec!(0.10), dec!(1000))];
    assert!(strategy
        .find_opportunities(&markets, &PositionMap::new())
        .await
        .is_empty());
}

// ---- index ----

fn index_options() -> IndexConfig {
    IndexConfig {
        index_id: "election-basket".to_string(),
        allocations: vec![AllocationConfig {
            market_id: "m1".to_string(),
            outcome: "YES".to_string(),
            target_shares: dec!(100),
            weight: dec!(1),
        }],
        ..IndexConfig::default()
    }
}

#[tokio::test]
async fn test_index_rebalances_deviating_allocation() {
    let options = index_options();
    let source = Arc::new(StaticIndexSource::from_config(&options));
    let strategy = IndexStrategy::new(options, Some(source));

    let markets = vec![make_market("m1", dec!(0.60), dec!(500000))];
    let mut positions = PositionMap::new();
    positions.insert(
        "m1".to_string(),
        Position {
            market_id: "m1".to_string(),
            outcome: "YES".to_string(),
            size: dec!(50),
        },
    );

    let opportunities = strategy.find_opportunities(&markets, &positions).await;
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.outcome, "YES");
    // Alignment trades never outrank edge-driven ones
    assert_eq!(opp.expected_value, Decimal::ZERO);
    assert_eq!(opp.confidence, dec!(0.90));
    assert_eq!(opp.risk_score, dec!(0.10));
    assert!(opp.evidence[0].contains("buy 50"));
}

#[tokio::test]
async fn test_index_within_threshold_is_quiet() {
    let options = index_options();
    let source = Arc::new(StaticIndexSource::from_config(&options));
    let strategy = IndexStrategy::new(options, Some(source));

    let markets = vec![make_market("m1", dec!(0.60), dec!(500000))];
    let mut positions = PositionMap::new();
    positions.insert(
        "m1".to_string(),
        Position {
            market_id: "m1".to_string(),
            outcome: "YES".to_string(),
            size: dec!(98),
        },
    );

    // 2% deviation is under the 5% threshold
    assert!(strategy
        .find_opportunities(&markets, &positions)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_index_exits_positions_dropped_from_index() {
    let options = index_options();
    let source = Arc::new(StaticIndexSource::from_config(&options));
    let strategy = IndexStrategy::new(options, Some(source));

    let markets = vec![
        make_market("m1", dec!(0.60), dec!(500000)),
        make_market("m2", dec!(0.40), dec!(500000)),
    ];
    let mut positions = PositionMap::new();
    positions.insert(
        "m1".to_string(),
        Position {
            market_id: "m1".to_string(),
            outcome: "YES".to_string(),
            size: dec!(100),
        },
    );
    positions.insert(
        "m2".to_string(),
        Position {
            market_id: "m2".to_string(),
            outcome: "YES".to_string(),
            size: dec!(30),
        },
    );

    let opportunities = strategy.find_opportunities(&markets, &positions).await;
    // m1 matches its target exactly; m2 is no longer in the index
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.market_id, "m2");
    assert_eq!(opp.confidence, dec!(0.95));
    assert_eq!(opp.predicted_probability, Decimal::ZERO);
    assert!(opp.evidence[0].contains("exit"));
}

#[tokio::test]
async fn test_index_respects_check_interval() {
    let options = index_options();
    let source = Arc::new(StaticIndexSource::from_config(&options));
    let strategy = IndexStrategy::new(options, Some(source));

    let markets = vec![make_market("m1", dec!(0.60), dec!(500000))];
    let positions = PositionMap::new();

    let first = strategy.find_opportunities(&markets, &positions).await;
    assert_eq!(first.len(), 1);
    // Immediately re-scanning is rate limited
    let second = strategy.find_opportunities(&markets, &positions).await;
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_index_inactive_without_source() {
    let strategy = IndexStrategy::new(IndexConfig::default(), None);
    assert!(!strategy.is_active());
}

// ---- selection ----

#[test]
fn test_strategy_kind_parsing() {
    assert_eq!(
        "threshold".parse::<StrategyKind>().unwrap(),
        StrategyKind::Threshold
    );
    assert_eq!(
        "llm-expiring".parse::<StrategyKind>().unwrap(),
        StrategyKind::LlmExpiring
    );
    assert_eq!("all".parse::<StrategyKind>().unwrap(), StrategyKind::All);
    assert!("momentum".parse::<StrategyKind>().is_err());
}

#[test]
fn test_build_strategies_all_includes_every_variant() {
    let config = crate::config::Config::default();
    let strategies = build_strategies(StrategyKind::All, &config, None, None);
    let names: Vec<_> = strategies.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "threshold",
            "llm-threshold",
            "expiring",
            "llm-expiring",
            "fusion",
            "index"
        ]
    );
}
