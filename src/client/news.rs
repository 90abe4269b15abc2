//! News provider and lexicon sentiment
//!
//! Searches recent articles for a market question and condenses them into a
//! [`NewsSignal`]: a bullish/bearish/neutral call with a confidence score
//! and the supporting articles. Sentiment is a small word-list heuristic;
//! model-based judgment lives in [`crate::client::judge`].

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::{debug, info};

const POSITIVE_WORDS: &[&str] = &[
    "surge", "soar", "rally", "boom", "growth", "gain", "rise", "increase", "positive", "success",
    "win", "victory", "breakthrough",
];

const NEGATIVE_WORDS: &[&str] = &[
    "crash", "plunge", "fall", "decline", "drop", "loss", "fail", "negative", "crisis", "concern",
    "worry", "risk", "threat",
];

const STOP_WORDS: &[&str] = &[
    "will", "the", "a", "an", "of", "in", "on", "by", "to", "be", "is", "are", "was", "for",
    "at", "before", "after", "than", "with",
];

/// Per-article lexicon sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleSentiment {
    Positive,
    Negative,
    Neutral,
}

/// Market-level direction call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "bullish"),
            Sentiment::Bearish => write!(f, "bearish"),
            Sentiment::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source: String,
    pub published_at: String,
    pub sentiment: ArticleSentiment,
}

/// Aggregated news evidence for one market question
#[derive(Debug, Clone)]
pub struct NewsSignal {
    pub market: String,
    pub sentiment: Sentiment,
    pub confidence: Decimal,
    pub articles: Vec<Article>,
}

impl NewsSignal {
    pub fn neutral(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            sentiment: Sentiment::Neutral,
            confidence: Decimal::ZERO,
            articles: Vec::new(),
        }
    }

    /// Per-outcome sentiment agreement. Bullish news supports YES; when
    /// the signal disagrees with the proposed side its confidence inverts.
    pub fn confidence_for(&self, outcome_side: &str) -> Decimal {
        let yes_side = outcome_side.eq_ignore_ascii_case("YES");
        match self.sentiment {
            Sentiment::Bullish if yes_side => self.confidence,
            Sentiment::Bearish if !yes_side => self.confidence,
            Sentiment::Neutral => self.confidence,
            _ => Decimal::ONE - self.confidence,
        }
    }
}

/// Abstract news capability consumed by strategies
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn market_signal(&self, question: &str) -> Result<NewsSignal>;
}

/// NewsAPI-style client
pub struct NewsClient {
    http: Client,
    api_url: String,
    api_key: String,
    days_back: i64,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    source: Option<RawSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

impl NewsClient {
    pub fn new(cfg: &crate::config::NewsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            days_back: cfg.days_back,
            page_size: cfg.page_size,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Search recent articles matching a query, annotated with sentiment.
    pub async fn search_articles(&self, query: &str, days_back: i64) -> Result<Vec<Article>> {
        if !self.is_enabled() {
            return Err(AgentError::ProviderUnavailable(
                "news provider not configured".to_string(),
            ));
        }
        let from_date = (Utc::now() - Duration::days(days_back))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!("{}/everything", self.api_url);
        let resp: NewsResponse = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", &self.page_size.to_string()),
                ("from", &from_date),
                ("apiKey", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(format!("news search: {e}")))?
            .error_for_status()
            .map_err(|e| AgentError::ProviderUnavailable(format!("news search: {e}")))?
            .json()
            .await?;

        let articles: Vec<Article> = resp
            .articles
            .into_iter()
            .map(|a| {
                let title = a.title.unwrap_or_default();
                let description = a.description.unwrap_or_default();
                let sentiment = lexicon_sentiment(&format!("{} {}", title, description));
                Article {
                    title,
                    description,
                    source: a.source.and_then(|s| s.name).unwrap_or_default(),
                    published_at: a.published_at.unwrap_or_default(),
                    sentiment,
                }
            })
            .collect();

        debug!(count = articles.len(), query, "news search");
        Ok(articles)
    }
}

#[async_trait]
impl NewsSource for NewsClient {
    async fn market_signal(&self, question: &str) -> Result<NewsSignal> {
        let keywords = extract_keywords(question);
        if keywords.is_empty() {
            return Ok(NewsSignal::neutral(question));
        }
        let articles = self.search_articles(&keywords, self.days_back).await?;
        if articles.is_empty() {
            return Ok(NewsSignal::neutral(question));
        }
        let signal = aggregate_signal(question, articles);
        info!(
            market = %crate::utils::truncate(question, 50),
            sentiment = %signal.sentiment,
            confidence = %signal.confidence,
            articles = signal.articles.len(),
            "news signal"
        );
        Ok(signal)
    }
}

/// Word-list sentiment for one headline + description.
pub fn lexicon_sentiment(text: &str) -> ArticleSentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => ArticleSentiment::Positive,
        std::cmp::Ordering::Less => ArticleSentiment::Negative,
        std::cmp::Ordering::Equal => ArticleSentiment::Neutral,
    }
}

/// Reduce a market question to a search query: drop punctuation and stop
/// words, keep the first six significant terms.
pub fn extract_keywords(question: &str) -> String {
    question
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold article sentiments into a direction call. A supermajority of one
/// polarity makes the call; a small per-article bonus rewards coverage
/// depth, capped at 0.95. Only the top five articles are kept as evidence.
pub fn aggregate_signal(market: &str, articles: Vec<Article>) -> NewsSignal {
    let total = Decimal::from(articles.len());
    let positive = Decimal::from(
        articles
            .iter()
            .filter(|a| a.sentiment == ArticleSentiment::Positive)
            .count(),
    );
    let negative = Decimal::from(
        articles
            .iter()
            .filter(|a| a.sentiment == ArticleSentiment::Negative)
            .count(),
    );

    let positive_ratio = positive / total;
    let negative_ratio = negative / total;

    let (sentiment, mut confidence) = if positive_ratio > dec!(0.6) {
        (Sentiment::Bullish, positive_ratio)
    } else if negative_ratio > dec!(0.6) {
        (Sentiment::Bearish, negative_ratio)
    } else {
        (Sentiment::Neutral, dec!(0.5))
    };

    let article_bonus = (total * dec!(0.02)).min(dec!(0.2));
    confidence = (confidence + article_bonus).min(dec!(0.95));

    let mut kept = articles;
    kept.truncate(5);

    NewsSignal {
        market: market.to_string(),
        sentiment,
        confidence,
        articles: kept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(sentiment: ArticleSentiment) -> Article {
        Article {
            title: "t".to_string(),
            description: "d".to_string(),
            source: "s".to_string(),
            published_at: String::new(),
            sentiment,
        }
    }

    #[test]
    fn test_lexicon_sentiment() {
        assert_eq!(
            lexicon_sentiment("Markets rally on breakthrough deal"),
            ArticleSentiment::Positive
        );
        assert_eq!(
            lexicon_sentiment("Stocks crash amid crisis fears"),
            ArticleSentiment::Negative
        );
        assert_eq!(lexicon_sentiment("Quiet day of trading"), ArticleSentiment::Neutral);
    }

    #[test]
    fn test_extract_keywords_drops_stop_words() {
        let q = extract_keywords("Will the Fed cut interest rates before March?");
        assert!(!q.to_lowercase().contains("will"));
        assert!(!q.to_lowercase().contains("the"));
        assert!(q.contains("Fed"));
        assert!(q.contains("rates"));
    }

    #[test]
    fn test_aggregate_bullish_supermajority() {
        let articles = vec![
            article(ArticleSentiment::Positive),
            article(ArticleSentiment::Positive),
            article(ArticleSentiment::Positive),
            article(ArticleSentiment::Negative),
        ];
        let signal = aggregate_signal("Q?", articles);
        assert_eq!(signal.sentiment, Sentiment::Bullish);
        // 3/4 ratio + 4 * 0.02 bonus
        assert_eq!(signal.confidence, dec!(0.83));
    }

    #[test]
    fn test_aggregate_mixed_is_neutral() {
        let articles = vec![
            article(ArticleSentiment::Positive),
            article(ArticleSentiment::Negative),
        ];
        let signal = aggregate_signal("Q?", articles);
        assert_eq!(signal.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_aggregate_keeps_top_five_articles() {
        let articles = (0..8).map(|_| article(ArticleSentiment::Positive)).collect();
        let signal = aggregate_signal("Q?", articles);
        assert_eq!(signal.articles.len(), 5);
    }

    #[test]
    fn test_confidence_for_inverts_on_disagreement() {
        let signal = NewsSignal {
            market: "Q?".to_string(),
            sentiment: Sentiment::Bullish,
            confidence: dec!(0.8),
            articles: vec![],
        };
        assert_eq!(signal.confidence_for("YES"), dec!(0.8));
        assert_eq!(signal.confidence_for("NO"), dec!(0.2));

        let bearish = NewsSignal {
            sentiment: Sentiment::Bearish,
            ..signal
        };
        assert_eq!(bearish.confidence_for("NO"), dec!(0.8));
        assert_eq!(bearish.confidence_for("YES"), dec!(0.2));
    }
}
