//! SignalOps command line: fuse one symbol, watch a list of symbols with the
//! agent arena, or look up prediction markets to wire into `fusion.events`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::RwLock;

use signalops::config::{generate_commented_config_template, Config};
use signalops::engine::{Arena, RoundResult, Standing};
use signalops::fusion::{audit_trail, MultiSourceDataFeed, Severity, UnifiedMarketRecord};
use signalops::persistence::InMemoryDecisionStore;
use signalops::sources::{http_client, PolymarketClient, SourceSet};
use signalops::trading::Action;
use signalops::utils::init_logging;

#[derive(Debug, Parser)]
#[command(name = "signalops", author, version, about = "Multi-source signal fusion CLI", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML). Defaults to ./config.toml, then
    /// the user config directory, then built-in defaults.
    #[arg(short, long, env = "SIGNALOPS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when SIGNALOPS_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fuse all sources for one symbol and print the unified record
    Fuse {
        symbol: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
        /// Also print the audit trail
        #[arg(long)]
        audit: bool,
    },
    /// Run one arena round for a symbol and print every agent's signal
    Agents {
        symbol: String,
    },
    /// Fuse symbols on an interval, run the arena, and serve /healthz, /metrics
    /// and /leaderboard
    Watch {
        #[arg(value_name = "SYMBOL", num_args = 1.., required = true)]
        symbols: Vec<String>,
        /// Seconds between rounds
        #[arg(long, default_value_t = 300)]
        interval: u64,
        /// Listen address for the HTTP endpoints
        #[arg(long, default_value = "127.0.0.1:8888")]
        addr: SocketAddr,
    },
    /// Search Polymarket for markets to add under [fusion.events]
    Discover {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write a commented configuration template
    Init {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    signalops::metrics::init().map_err(|e| anyhow::anyhow!("metrics init failed: {e}"))?;

    if args.print_default_config {
        println!("{}", Config::default_toml()?);
        return Ok(());
    }

    let Some(command) = args.command else {
        println!("Nothing to do. Try `signalops --help`.");
        return Ok(());
    };

    if let Command::Init { config, force } = &command {
        return init(config, *force);
    }

    let config = load_config(args.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    match command {
        Command::Fuse { symbol, json, audit } => fuse(&config, &symbol, json, audit).await,
        Command::Agents { symbol } => agents(&config, &symbol).await,
        Command::Watch { symbols, interval, addr } => watch(&config, symbols, interval, addr).await,
        Command::Discover { query, limit } => discover(&config, &query, limit).await,
        Command::Init { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) if p.exists() => {
            Config::from_file(p).with_context(|| format!("Failed to load configuration from {}", p.display()))
        }
        Some(p) => {
            log::warn!("Configuration file '{}' not found, using defaults", p.display());
            let mut config = Config::default();
            config.merge_env()?;
            Ok(config)
        }
        None => Config::load().context("Failed to load configuration"),
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists. Use --force to overwrite.", path.display());
    }
    generate_commented_config_template(path)?;
    println!("✅ Wrote config template to {}", path.display());
    Ok(())
}

async fn fused_record(config: &Config, sources: &SourceSet, symbol: &str) -> Result<UnifiedMarketRecord> {
    let market = sources
        .prices
        .snapshot(symbol)
        .await
        .with_context(|| format!("No market data for {symbol}"))?;
    let feed = MultiSourceDataFeed::with_sources(sources, config);
    Ok(feed.get_unified_data(symbol, market, &config.fusion.events).await)
}

async fn fuse(config: &Config, symbol: &str, json: bool, audit: bool) -> Result<()> {
    let sources = SourceSet::from_config(config)?;
    let record = fused_record(config, &sources, symbol).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        if audit {
            println!("{}", serde_json::to_string_pretty(&audit_trail(&record))?);
        }
        return Ok(());
    }

    print_record(&record);
    if audit {
        let trail = audit_trail(&record);
        println!("\n{}", "Audit".bold());
        println!("  sources used: {}", trail.sources_used);
        for t in &trail.triggers_met {
            println!("  {:?} {} = {:.3} {} {:.3} -> {:?}", t.source, t.metric, t.value, t.threshold_operator, t.threshold_value, t.status);
        }
    }
    Ok(())
}

fn paint(action: Action) -> colored::ColoredString {
    match action {
        Action::Buy => action.to_string().green().bold(),
        Action::Sell => action.to_string().red().bold(),
        Action::Hold => action.to_string().yellow().bold(),
    }
}

fn print_record(record: &UnifiedMarketRecord) {
    println!("{} {} @ {:.4}", "📊".bold(), record.symbol.bold(), record.price());
    println!("  24h change: {:+.2}%", record.market.price_change_pct);

    match record.fundamentals.as_available() {
        Some(f) => println!(
            "  fundamentals: P/B {} P/E {} D/E {} value score {:.2}{}",
            fmt_opt(f.price_to_book),
            fmt_opt(f.price_to_earnings),
            fmt_opt(f.debt_to_equity),
            f.value_score,
            if f.is_net_net { " (net-net)".green().to_string() } else { String::new() }
        ),
        None => println!("  fundamentals: {}", "unavailable".dimmed()),
    }

    for (name, odds) in &record.events {
        println!("  event {}: {:.1}% YES ({})", name, odds.yes_probability * 100.0, odds.title);
    }

    match record.onchain.as_available() {
        Some(h) => println!(
            "  on-chain {}: TVL {:.0} ({:+.2}% 1d) {:?}",
            h.chain, h.current_tvl, h.tvl_change_1d, h.sentiment
        ),
        None => println!("  on-chain: {}", "n/a".dimmed()),
    }

    match &record.technical {
        Some(t) => println!("  technical: RSI {} -> {} ({})", fmt_opt(t.rsi_14), paint(t.signal), t.note),
        None => println!("  technical: {}", "timed out".dimmed()),
    }

    for c in &record.conflicts {
        let tag = match c.severity {
            Severity::High => "HIGH".red().bold(),
            Severity::Medium => "MEDIUM".yellow(),
        };
        println!("  ⚠️  {} {} [{}]", tag, c.description, c.recommendation);
    }

    let consensus = &record.consensus;
    println!(
        "  consensus: {} {:.0}% from {} sources (buy {} / sell {} / hold {}){}",
        paint(consensus.action),
        consensus.confidence * 100.0,
        consensus.sources_count,
        consensus.votes.buy,
        consensus.votes.sell,
        consensus.votes.hold,
        if consensus.vetoed { " VETOED".red().to_string() } else { String::new() }
    );
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

async fn agents(config: &Config, symbol: &str) -> Result<()> {
    let sources = SourceSet::from_config(config)?;
    let record = fused_record(config, &sources, symbol).await?;
    let mut arena = Arena::from_config(config)?;
    println!("🤖 {} agents: {}", arena.agent_names().len(), arena.agent_names().join(", "));

    let round = arena.run_round(&record).await?;
    print_round(&round);
    Ok(())
}

fn print_round(round: &RoundResult) {
    for s in &round.signals {
        println!("  {:<20} {} {:.0}%  {}", s.agent_name, paint(s.action), s.confidence * 100.0, s.reason);
    }
    for (agent, err) in &round.errors {
        println!("  {:<20} {} {}", agent, "ERROR".red(), err);
    }
    match &round.winner {
        Some(w) => println!(
            "🏆 {} {}{}",
            w.agent_name.bold(),
            round.explanation,
            if round.explored { " (explore)".dimmed().to_string() } else { String::new() }
        ),
        None => println!("  {}", round.explanation.dimmed()),
    }
}

type Board = Arc<RwLock<Vec<Standing>>>;

async fn health() -> impl IntoResponse {
    "OK"
}

async fn metrics_handler() -> impl IntoResponse {
    signalops::metrics::render()
}

async fn leaderboard(State(board): State<Board>) -> Json<Vec<Standing>> {
    Json(board.read().await.clone())
}

async fn watch(config: &Config, symbols: Vec<String>, interval: u64, addr: SocketAddr) -> Result<()> {
    let sources = SourceSet::from_config(config)?;
    let store = Arc::new(InMemoryDecisionStore::new());
    let mut arena = Arena::from_config(config)?.with_store(store.clone());
    let board: Board = Arc::new(RwLock::new(arena.leaderboard()));

    let app = Router::new()
        .route("/", get(|| async { "SignalOps running" }))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/leaderboard", get(leaderboard))
        .with_state(board.clone());
    let server = axum::Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {addr}"))?
        .serve(app.into_make_service());
    log::info!("Serving /healthz, /metrics and /leaderboard on http://{}", addr);
    let server_handle = tokio::spawn(server);

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for symbol in &symbols {
                    let record = match fused_record(config, &sources, symbol).await {
                        Ok(r) => r,
                        Err(e) => {
                            log::warn!("skipping {}: {:#}", symbol, e);
                            continue;
                        }
                    };
                    print_record(&record);
                    match arena.run_round(&record).await {
                        Ok(round) => print_round(&round),
                        Err(e) => log::error!("arena round for {} failed: {}", symbol, e),
                    }
                }
                *board.write().await = arena.leaderboard();
                log::info!("epoch {} done, {} decisions logged", arena.epoch(), store.len().await);
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutdown signal received. Stopping...");
                break;
            }
        }
    }

    server_handle.abort();
    Ok(())
}

async fn discover(config: &Config, query: &str, limit: usize) -> Result<()> {
    let client = PolymarketClient::new(http_client(&config.sources)?, &config.sources.polymarket_url);
    let markets = client.search_markets(query, limit).await.context("Polymarket search failed")?;
    if markets.is_empty() {
        println!("No markets match {query:?}");
        return Ok(());
    }
    for m in &markets {
        println!("{:>10}  {:>5.1}% YES  vol {:>12.0}  {}", m.id.bold(), m.yes_probability * 100.0, m.volume, m.question);
    }
    println!("\nAdd one under [fusion.events], e.g.\n  my_event = \"{}\"", markets[0].id);
    Ok(())
}
