use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use polymarket_movers::analysis::MarketAnalyzer;
use polymarket_movers::api::health::HealthState;
use polymarket_movers::api::latency::LatencyStats;
use polymarket_movers::api::{router, ApiState};
use polymarket_movers::cli::{self, Cli, Commands};
use polymarket_movers::config::Config;
use polymarket_movers::db::{PriceReader, SqliteStore};
use polymarket_movers::error::Result;
use polymarket_movers::fetcher::ClobClient;
use polymarket_movers::ingest::Ingestor;
use polymarket_movers::scheduler::ScanScheduler;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // Reports go to stdout; keep logs on stderr so they don't interleave.
    let subscriber = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&cfg.log_level));
    if matches!(cli.command, Commands::Serve(_)) {
        subscriber.init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    if let Err(e) = run(cli.command, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, cfg: Config) -> Result<()> {
    let store = match command {
        Commands::Config => {
            print!("{}", cli::render_config(&cfg));
            return Ok(());
        }
        _ => Arc::new(SqliteStore::connect(&cfg.db_url()).await?),
    };
    let reader: Arc<dyn PriceReader> = store.clone();
    let analyzer = MarketAnalyzer::new(reader, cfg.analysis);

    match command {
        Commands::Config => {}
        Commands::Serve(args) => {
            serve(
                &cfg,
                store,
                analyzer,
                args.interval.unwrap_or(cfg.scan_interval_secs),
            )
            .await?;
        }
        Commands::Scan(args) => {
            let ingestor = Ingestor::new(ClobClient::new(&cfg.clob_api_url)?, store);
            let report = ingestor
                .full_scan(args.market_limit.or(cfg.market_limit))
                .await?;
            print!("{}", cli::render_scan(&report));
        }
        Commands::Changes(args) => {
            let threshold = cfg.analysis.threshold_or_default(args.threshold);
            let window = cfg.analysis.window_or_default(args.window);
            let changes = analyzer
                .find_significant_changes(Some(threshold), Some(window), args.limit)
                .await?;
            print!("{}", cli::render_changes(&changes, threshold, window));
        }
        Commands::Movers(args) => {
            let window = cfg.analysis.window_or_default(args.window);
            let movers = analyzer
                .get_top_movers(Some(window), args.limit, args.direction)
                .await?;
            print!("{}", cli::render_movers(&movers, args.direction, window));
        }
        Commands::Trending(args) => {
            let window = cfg.analysis.window_or_default(args.window);
            let trending = analyzer
                .get_trending_markets(Some(window), args.limit)
                .await?;
            print!("{}", cli::render_trending(&trending, window));
        }
        Commands::Market(args) => {
            let summary = analyzer.get_market_summary(&args.condition_id).await?;
            print!(
                "{}",
                cli::render_market_lookup(&args.condition_id, summary.as_ref())
            );
        }
        Commands::Stats => {
            let stats = analyzer.store().stats().await?;
            print!("{}", cli::render_stats(&stats));
        }
    }

    Ok(())
}

async fn serve(
    cfg: &Config,
    store: Arc<SqliteStore>,
    analyzer: MarketAnalyzer<dyn PriceReader>,
    interval_secs: u64,
) -> Result<()> {
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    // Scan scheduler (background; first scan runs immediately)
    let ingestor = Ingestor::new(ClobClient::new(&cfg.clob_api_url)?, store);
    let scheduler = ScanScheduler::new(
        ingestor,
        Arc::clone(&health),
        interval_secs,
        cfg.market_limit,
    );
    tokio::spawn(async move { scheduler.run().await });

    // HTTP API server
    let app = router(ApiState {
        analyzer,
        health,
        latency,
    });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
