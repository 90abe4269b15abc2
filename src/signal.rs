//! Pure signal primitives
//!
//! Stateless scoring functions shared by the strategies and the risk gate.
//! All scores live in `[0, 1]`; position sizes are currency amounts.

use crate::client::news::ArticleSentiment;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// risk_score penalty weights; they sum to 1.0 so the score is bounded
const VOLUME_RISK_WEIGHT: Decimal = dec!(0.3);
const TIME_RISK_WEIGHT: Decimal = dec!(0.3);
const EDGE_RISK_WEIGHT: Decimal = dec!(0.4);

const LOW_VOLUME_FLOOR: Decimal = dec!(50000);
const NEAR_EXPIRY_HOURS: Decimal = dec!(24);
const THIN_EDGE_FLOOR: Decimal = dec!(0.1);

/// Default fraction of full Kelly actually deployed.
pub const KELLY_CONSERVATIVE_FACTOR: Decimal = dec!(0.25);

/// Price-extremity score. Rewards very cheap and very expensive prices
/// symmetrically for either outcome side: a cheap NO is as interesting as
/// a cheap YES. Step breakpoints are a policy choice, not an invariant.
pub fn price_signal(price: Decimal, _outcome_side: &str) -> Decimal {
    if price < dec!(0.20) {
        dec!(0.80)
    } else if price < dec!(0.35) {
        dec!(0.65)
    } else if price > dec!(0.80) {
        dec!(0.20)
    } else if price > dec!(0.65) {
        dec!(0.35)
    } else {
        dec!(0.50)
    }
}

/// Volume score, monotone non-decreasing. Thin markets score at most 0.5
/// to reflect weak confidence in their prices.
pub fn volume_signal(volume: Decimal) -> Decimal {
    if volume > dec!(1000000) {
        dec!(0.9)
    } else if volume > dec!(500000) {
        dec!(0.75)
    } else if volume > dec!(100000) {
        dec!(0.6)
    } else if volume > dec!(50000) {
        dec!(0.5)
    } else {
        dec!(0.3)
    }
}

/// Composite risk score: independent penalties for low volume, imminent
/// expiry, and a thin edge. Bounded by 1.0 because the weights sum to 1.0.
pub fn risk_score(
    volume: Decimal,
    hours_to_expiry: Option<Decimal>,
    edge: Decimal,
) -> Decimal {
    let volume_risk = if volume < LOW_VOLUME_FLOOR {
        VOLUME_RISK_WEIGHT
    } else {
        Decimal::ZERO
    };
    let time_risk = match hours_to_expiry {
        Some(h) if h < NEAR_EXPIRY_HOURS => TIME_RISK_WEIGHT,
        _ => Decimal::ZERO,
    };
    let edge_risk = if edge < THIN_EDGE_FLOOR {
        EDGE_RISK_WEIGHT
    } else {
        Decimal::ZERO
    };
    volume_risk + time_risk + edge_risk
}

/// Fractional-Kelly position size in whole currency units.
///
/// Kelly for a binary claim paying 1: f* = edge / (1 - price). The raw
/// size is scaled by the conservative factor, capped by the per-trade risk
/// limit, and floored to a non-negative integer amount. Fails closed
/// (returns zero) at price >= 1.0 where the formula's domain ends.
pub fn kelly_position_size(
    edge: Decimal,
    price: Decimal,
    max_position: Decimal,
    risk_limit: Decimal,
    conservative_factor: Decimal,
) -> Decimal {
    if price >= Decimal::ONE {
        return Decimal::ZERO;
    }
    let kelly_fraction = edge / (Decimal::ONE - price);
    let raw_size = kelly_fraction * conservative_factor * max_position;
    raw_size.min(risk_limit).floor().max(Decimal::ZERO)
}

/// Map an article's lexicon sentiment to a per-outcome score: positive
/// coverage supports YES at 0.7 and, by complement, NO at 0.3.
pub fn article_sentiment_score(sentiment: ArticleSentiment, outcome_side: &str) -> Decimal {
    let base = match sentiment {
        ArticleSentiment::Positive => dec!(0.7),
        ArticleSentiment::Negative => dec!(0.3),
        ArticleSentiment::Neutral => dec!(0.5),
    };
    if outcome_side.eq_ignore_ascii_case("YES") {
        base
    } else {
        Decimal::ONE - base
    }
}
