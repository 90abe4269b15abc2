//! Polymarket Opportunity Agent
//!
//! CLI entry point: run the decision loop, list the current market
//! snapshot, or analyze one market through the full strategy set.

use clap::{Parser, Subcommand};
use polymarket_agent::{
    agent::Agent,
    client::{ClobClient, GammaClient, Judge, JudgeClient, NewsClient, NewsSource},
    config::Config,
    error::AgentError,
    strategy::{self, StrategyKind},
    types::PositionMap,
    utils,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "polymarket-agent")]
#[command(about = "Multi-strategy opportunity agent for Polymarket prediction markets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the decision loop
    Run {
        /// Strategy selection (threshold, llm-threshold, expiring,
        /// llm-expiring, fusion, index, all)
        #[arg(short, long, default_value = "all")]
        strategy: StrategyKind,

        /// Stop after this many iterations instead of running until
        /// shutdown
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Show the current market snapshot
    Markets {
        /// Number of top markets to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Analyze a single market through the full strategy set
    Analyze {
        /// Market ID to analyze
        market_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Run {
            strategy,
            iterations,
        } => run_agent(config, strategy, iterations).await,
        Commands::Markets { limit } => show_markets(config, limit).await,
        Commands::Analyze { market_id } => analyze_market(config, &market_id).await,
    }
}

fn build_news(config: &Config) -> Option<Arc<dyn NewsSource>> {
    match NewsClient::new(&config.news) {
        Ok(client) if client.is_enabled() => Some(Arc::new(client)),
        Ok(_) => {
            tracing::info!("NEWS_API_KEY not set, news signals disabled");
            None
        }
        Err(e) => {
            tracing::warn!("failed to build news client: {e}");
            None
        }
    }
}

fn build_judge(config: &Config) -> Option<Arc<dyn Judge>> {
    match JudgeClient::new(&config.judge) {
        Ok(client) if client.is_enabled() => Some(Arc::new(client)),
        Ok(_) => {
            tracing::info!("OPENROUTER_API_KEY not set, model-assisted strategies disabled");
            None
        }
        Err(e) => {
            tracing::warn!("failed to build judge client: {e}");
            None
        }
    }
}

async fn run_agent(
    config: Config,
    kind: StrategyKind,
    iterations: Option<u64>,
) -> anyhow::Result<()> {
    let gamma = GammaClient::new(&config.polymarket.gamma_url)?;
    let clob = ClobClient::new(&config.polymarket.clob_url, &config.polymarket.private_key);
    let news = build_news(&config);
    let judge = build_judge(&config);

    let strategies = strategy::build_strategies(kind, &config, news, judge);
    let active: Vec<_> = strategies
        .iter()
        .filter(|s| s.is_active())
        .map(|s| s.name())
        .collect();
    tracing::info!(?active, "strategy set built");

    let mut agent = Agent::new(config, gamma, clob, strategies);
    agent.run(iterations).await;
    Ok(())
}

async fn show_markets(config: Config, limit: usize) -> anyhow::Result<()> {
    let gamma = GammaClient::new(&config.polymarket.gamma_url)?;
    let markets = gamma.list_active_markets(limit, None).await?;

    println!("{:<18} {:>8} {:>12}  question", "id", "yes", "volume");
    for market in &markets {
        let yes = market
            .prices
            .first()
            .map(|p| utils::fmt_pct(*p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<18} {:>8} {:>12}  {}",
            utils::truncate(&market.id, 18),
            yes,
            market.volume.round_dp(0),
            utils::truncate(&market.question, 60),
        );
    }
    Ok(())
}

async fn analyze_market(config: Config, market_id: &str) -> anyhow::Result<()> {
    let gamma = GammaClient::new(&config.polymarket.gamma_url)?;
    let Some(market) = gamma.get_market_by_id(market_id).await? else {
        return Err(AgentError::MarketNotFound(market_id.to_string()).into());
    };

    println!("{}", market.question);
    for (outcome, price) in market.outcomes.iter().zip(&market.prices) {
        println!("  {outcome}: {}", utils::fmt_pct(*price));
    }
    println!("  volume: {}", market.volume.round_dp(0));
    if let Some(end) = market.end_date {
        println!("  resolves: {end}");
    }

    let news = build_news(&config);
    let judge = build_judge(&config);
    let strategies = strategy::build_strategies(StrategyKind::All, &config, news, judge);

    let markets = vec![market];
    let positions = PositionMap::new();
    for s in strategies.iter().filter(|s| s.is_active()) {
        let opportunities = s.find_opportunities(&markets, &positions).await;
        if opportunities.is_empty() {
            println!("\n[{}] no opportunity", s.name());
            continue;
        }
        for opp in opportunities {
            println!("\n[{}] {}", s.name(), opp);
            println!(
                "  edge {}, expected value {}, risk {}",
                utils::fmt_pct(opp.edge()),
                opp.expected_value.round_dp(2),
                utils::fmt_pct(opp.risk_score),
            );
            for line in &opp.evidence {
                println!("  - {line}");
            }
        }
    }
    Ok(())
}
