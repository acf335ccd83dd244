//! `crypto` - query CoinGecko market data from the command line
//!
//! Every subcommand prints its payload as pretty JSON on stdout. Logs and
//! notices go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crypto_tracker::{
    constants::{DEFAULT_CHART_DAYS, DEFAULT_PER_PAGE, MAX_PER_PAGE},
    CoinResolver, FetchConfig, Fetched, MarketDataService, MarketOrder, MarketsQuery, Origin,
};

/// Cryptocurrency market data from CoinGecko
#[derive(Parser, Debug)]
#[command(name = "crypto")]
#[command(about = "Cached, rate-limited CoinGecko market data")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Print fetch metrics to stderr when done
    #[arg(long, global = true)]
    stats: bool,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the fetch layer; unset flags keep the environment/default value
#[derive(Args, Debug)]
struct FetchArgs {
    /// In-memory cache TTL in seconds
    #[arg(long, global = true, value_name = "SECS")]
    ttl: Option<u64>,

    /// Minimum spacing between outbound requests in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    rate_limit_ms: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Maximum attempts per request
    #[arg(long, global = true, value_name = "N")]
    retries: Option<u32>,

    /// Base backoff between attempts in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    retry_delay_ms: Option<u64>,

    /// Offline cache file
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "no_offline_cache")]
    offline_cache: Option<PathBuf>,

    /// Keep the offline cache in memory only
    #[arg(long, global = true)]
    no_offline_cache: bool,
}

impl FetchArgs {
    fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if let Some(secs) = self.ttl {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = self.rate_limit_ms {
            config.rate_limit_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.retries {
            config.max_attempts = attempts;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.retry_base_delay = Duration::from_millis(ms);
        }
        if let Some(path) = &self.offline_cache {
            config.offline_cache_path = Some(path.clone());
        }
        if self.no_offline_cache {
            config.offline_cache_path = None;
        }
        config.normalized()
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Market listing
    List {
        /// Quote currency
        #[arg(long, default_value = "usd")]
        vs: String,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: u32,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// market_cap_desc, market_cap_asc, volume_desc, volume_asc, id_desc or id_asc
        #[arg(long, default_value_t = MarketOrder::MarketCapDesc)]
        order: MarketOrder,
        /// Restrict to these coin ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },
    /// Free-text coin search
    Search { query: String },
    /// Coin detail record; accepts ids, symbols or names
    Detail { coin: String },
    /// Historical prices
    Chart {
        coin: String,
        #[arg(long, default_value = "usd")]
        vs: String,
        #[arg(long, default_value_t = DEFAULT_CHART_DAYS)]
        days: u32,
    },
    /// Trending coins
    Trending,
    /// Spot prices
    Price {
        /// Coin ids
        #[arg(required = true)]
        ids: Vec<String>,
        /// Quote currencies (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "usd")]
        vs: Vec<String>,
    },
    /// Resolve an id, symbol or name to a coin
    Resolve { input: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.fetch.apply(FetchConfig::from_env());
    tracing::debug!(?config, "Starting");

    let service = Arc::new(MarketDataService::new(config)?);
    let result = run(&service, cli.command).await;

    if cli.stats {
        let metrics = service.metrics().await;
        eprintln!(
            "[{}] attempts={} failed={} success_rate={:.2} p50={:.0}ms p99={:.0}ms memory_hits={} offline_served={}",
            metrics.transport,
            metrics.total_attempts,
            metrics.failed_attempts,
            metrics.success_rate,
            metrics.latency_p50_ms,
            metrics.latency_p99_ms,
            metrics.memory_hits,
            metrics.offline_served
        );
    }

    result
}

async fn run(
    service: &Arc<MarketDataService>,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List {
            vs,
            per_page,
            page,
            order,
            ids,
        } => {
            let mut query = MarketsQuery::new(vs)
                .per_page(per_page.clamp(1, MAX_PER_PAGE))
                .page(page.max(1))
                .order(order);
            if !ids.is_empty() {
                query = query.ids(ids);
            }
            emit(&service.markets(&query).await?)
        }
        Command::Search { query } => emit(&service.search(&query).await?),
        Command::Detail { coin } => {
            let id = resolve_id(service, &coin).await?;
            emit(&service.coin_detail(&id).await?)
        }
        Command::Chart { coin, vs, days } => {
            let id = resolve_id(service, &coin).await?;
            emit(&service.market_chart(&id, &vs, days).await?)
        }
        Command::Trending => emit(&service.trending().await?),
        Command::Price { ids, vs } => emit(&service.simple_price(ids.as_slice(), vs.as_slice()).await?),
        Command::Resolve { input } => {
            let coin = CoinResolver::new(service.clone()).resolve(&input).await?;
            match coin {
                Some(coin) => print_json(&coin),
                None => Err(format!("No coin matches '{}'", input).into()),
            }
        }
    }
}

async fn resolve_id(
    service: &Arc<MarketDataService>,
    input: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    CoinResolver::new(service.clone())
        .resolve(input)
        .await?
        .map(|coin| coin.id)
        .ok_or_else(|| format!("No coin matches '{}'", input).into())
}

fn emit<T: Serialize>(fetched: &Fetched<T>) -> Result<(), Box<dyn std::error::Error>> {
    if let Origin::Offline { captured_at } = fetched.origin {
        eprintln!(
            "warning: provider unreachable, showing data captured at {}",
            captured_at.to_rfc3339()
        );
    }
    print_json(&fetched.data)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
