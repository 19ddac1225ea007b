//! Command-line interface for the `movers` binary.
//!
//! Subcommands:
//! - `serve`: scheduled scans plus the HTTP API
//! - `scan`: one full scan
//! - `changes`, `movers`, `trending`, `market`: analysis reports
//! - `stats`, `config`: store and configuration info
//!
//! The `render_*` functions produce the plain-text output so they can be
//! tested without a terminal.

use std::fmt::Write as _;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::types::{Direction, MarketSummary, PriceChange, ScanReport, StoreStats, TrendingMarket};

#[derive(Parser, Debug)]
#[command(name = "movers")]
#[command(about = "Track Polymarket prices and surface the biggest movers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scheduled scans and serve the HTTP API
    Serve(ServeArgs),
    /// Perform one full scan of markets and prices
    Scan(ScanArgs),
    /// Show significant price changes
    Changes(ChangesArgs),
    /// Show top price movers
    Movers(MoversArgs),
    /// Show trending markets (most volatile)
    Trending(TrendingArgs),
    /// Show detailed information for a specific market
    Market(MarketArgs),
    /// Show database statistics
    Stats,
    /// Show current configuration
    Config,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Seconds between scans (defaults to SCAN_INTERVAL_SECONDS)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Stop after this many markets (defaults to MARKET_LIMIT, or all)
    #[arg(short = 'm', long)]
    pub market_limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ChangesArgs {
    /// Change threshold percentage
    #[arg(short, long)]
    pub threshold: Option<f64>,
    /// Time window in minutes
    #[arg(short, long)]
    pub window: Option<u32>,
    /// Maximum number of results
    #[arg(short, long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct MoversArgs {
    /// Time window in minutes
    #[arg(short, long)]
    pub window: Option<u32>,
    /// Maximum number of results
    #[arg(short, long, default_value_t = 15)]
    pub limit: usize,
    /// Filter by direction
    #[arg(short, long, value_enum, default_value_t = Direction::Both)]
    pub direction: Direction,
}

#[derive(Args, Debug)]
pub struct TrendingArgs {
    /// Time window in minutes
    #[arg(short, long)]
    pub window: Option<u32>,
    /// Maximum number of results
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct MarketArgs {
    pub condition_id: String,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_scan(report: &ScanReport) -> String {
    format!(
        "Scan completed\n  Markets: {}\n  Prices:  {}\n  Time:    {:.2}s\n",
        report.markets, report.prices, report.elapsed_secs
    )
}

pub fn render_changes(changes: &[PriceChange], threshold: f64, window: u32) -> String {
    let mut out = format!("Significant price changes (>= {threshold}% over {window} minutes)\n\n");
    if changes.is_empty() {
        out.push_str("No significant changes found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:<50}  {:<10}  {:>9}  {:>9}  {:>9}",
        "Market", "Outcome", "Old", "New", "Change"
    );
    for c in changes {
        let _ = writeln!(
            out,
            "{:<50}  {:<10}  {:>9.4}  {:>9.4}  {:>9}",
            truncate(&c.question, 50),
            truncate(&c.outcome, 10),
            c.old_price,
            c.new_price,
            format_percent(c.change_percent),
        );
    }
    let _ = writeln!(out, "\nFound {} significant changes", changes.len());
    out
}

pub fn render_movers(movers: &[PriceChange], direction: Direction, window: u32) -> String {
    let mut out = format!("Top movers over {window} minutes ({direction})\n\n");
    if movers.is_empty() {
        out.push_str("No price movements found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>3}  {:<45}  {:<8}  {:>8}  {:>9}",
        "#", "Market", "Outcome", "Price", "Change"
    );
    for (i, c) in movers.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<45}  {:<8}  {:>8.4}  {:>9}",
            i + 1,
            truncate(&c.question, 45),
            truncate(&c.outcome, 8),
            c.new_price,
            format_percent(c.change_percent),
        );
    }
    out
}

pub fn render_trending(markets: &[TrendingMarket], window: u32) -> String {
    let mut out = format!("Most volatile markets over {window} minutes\n\n");
    if markets.is_empty() {
        out.push_str("No trending markets found.\n");
        return out;
    }

    let _ = writeln!(
        out,
        "{:>3}  {:<55}  {:>10}  {:>10}  {:>7}",
        "#", "Market", "Max", "Total", "Tokens"
    );
    for (i, m) in markets.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<55}  {:>9.2}%  {:>9.2}%  {:>7}",
            i + 1,
            truncate(&m.question, 55),
            m.max_change,
            m.total_volatility,
            m.num_changes,
        );
    }
    out
}

pub fn render_market(summary: &MarketSummary) -> String {
    let m = &summary.market;
    let mut out = String::new();
    let _ = writeln!(out, "Question:     {}", m.question);
    let _ = writeln!(out, "Condition ID: {}", m.condition_id);
    let _ = writeln!(out, "Market slug:  {}", m.market_slug.as_deref().unwrap_or("N/A"));
    let _ = writeln!(out, "End date:     {}", m.end_date_iso.as_deref().unwrap_or("N/A"));
    let _ = writeln!(
        out,
        "Status:       {} | {}\n",
        if m.active { "Active" } else { "Inactive" },
        if m.closed { "Closed" } else { "Open" },
    );

    let _ = writeln!(
        out,
        "{:<20}  {:>8}  {:>9}  {:>16}",
        "Outcome", "Price", "Change", "Last updated"
    );
    for t in &summary.tokens {
        let price = t
            .current_price
            .map_or("N/A".to_string(), |p| format!("{p:.4}"));
        let change = t
            .change
            .as_ref()
            .map_or("N/A".to_string(), |c| format_percent(c.change_percent));
        let updated = t.timestamp_ns.map_or("N/A".to_string(), format_datetime_ns);
        let _ = writeln!(
            out,
            "{:<20}  {:>8}  {:>9}  {:>16}",
            truncate(&t.outcome, 20),
            price,
            change,
            updated
        );
    }
    out
}

/// Market report, or a not-found line when the lookup came back empty.
pub fn render_market_lookup(condition_id: &str, summary: Option<&MarketSummary>) -> String {
    match summary {
        Some(summary) => render_market(summary),
        None => format!("Market not found: {condition_id}\n"),
    }
}

pub fn render_stats(stats: &StoreStats) -> String {
    format!(
        "Total markets:     {}\nActive markets:    {}\nTotal tokens:      {}\nPrice data points: {}\n",
        stats.total_markets, stats.active_markets, stats.total_tokens, stats.total_price_points
    )
}

pub fn render_config(cfg: &Config) -> String {
    let market_limit = cfg
        .market_limit
        .map_or("all".to_string(), |n| n.to_string());
    format!(
        "Database:\n  Path: {}\n\nScanner:\n  Scan interval: {}s\n  Market limit: {}\n  Default change threshold: {}%\n  Time window: {} minutes\n\nAPI:\n  CLOB URL: {}\n  HTTP port: {}\n  Log level: {}\n",
        cfg.db_path,
        cfg.scan_interval_secs,
        market_limit,
        cfg.analysis.threshold_percent,
        cfg.analysis.window_minutes,
        cfg.clob_api_url,
        cfg.api_port,
        cfg.log_level,
    )
}

// ---------------------------------------------------------------------------
// Formatting helpers (shared with the TUI)
// ---------------------------------------------------------------------------

/// `+4.20%` / `-3.10%`.
pub fn format_percent(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{pct:.2}%")
    } else {
        format!("{pct:.2}%")
    }
}

/// Convert nanosecond epoch timestamp to HH:MM:SS string.
pub fn format_time_ns(ns: i64) -> String {
    let secs = (ns / 1_000_000_000) as u64;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// UTC `YYYY-MM-DD HH:MM`.
pub fn format_datetime_ns(ns: i64) -> String {
    chrono::DateTime::from_timestamp_nanos(ns)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Cut to `max` characters, ending with an ellipsis when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Market;

    fn change(question: &str, pct: f64) -> PriceChange {
        PriceChange {
            condition_id: "c".to_string(),
            question: question.to_string(),
            token_id: "t".to_string(),
            outcome: "Yes".to_string(),
            old_price: 0.5,
            new_price: 0.5 * (1.0 + pct / 100.0),
            change_percent: pct,
            change_absolute: 0.5 * pct / 100.0,
            window_minutes: 60,
            old_timestamp_ns: 0,
            new_timestamp_ns: 0,
        }
    }

    #[test]
    fn parses_movers_flags() {
        let cli = Cli::parse_from(["movers", "movers", "-w", "30", "-d", "down"]);
        match cli.command {
            Commands::Movers(args) => {
                assert_eq!(args.window, Some(30));
                assert_eq!(args.limit, 15);
                assert_eq!(args.direction, Direction::Down);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn changes_defaults_leave_threshold_unset() {
        let cli = Cli::parse_from(["movers", "changes"]);
        match cli.command {
            Commands::Changes(args) => {
                assert_eq!(args.threshold, None);
                assert_eq!(args.window, None);
                assert_eq!(args.limit, 20);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn signed_percentages() {
        assert_eq!(format_percent(4.2), "+4.20%");
        assert_eq!(format_percent(-3.1), "-3.10%");
        assert_eq!(format_percent(0.0), "0.00%");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("éééééé", 3), "éé…");
    }

    #[test]
    fn time_formatting() {
        // 2023-11-14 22:13:20 UTC
        let ns = 1_700_000_000_000_000_000;
        assert_eq!(format_time_ns(ns), "22:13:20");
        assert_eq!(format_datetime_ns(ns), "2023-11-14 22:13");
    }

    #[test]
    fn empty_reports_say_so() {
        assert!(render_changes(&[], 5.0, 60).contains("No significant changes found."));
        assert!(render_movers(&[], Direction::Up, 60).contains("No price movements found."));
        assert!(render_trending(&[], 60).contains("No trending markets found."));
    }

    #[test]
    fn changes_table_truncates_and_signs() {
        let long = "Will the long-running question with many words resolve before the deadline?";
        let out = render_changes(&[change(long, 12.5), change("Short?", -6.0)], 5.0, 60);
        assert!(out.contains("+12.50%"));
        assert!(out.contains("-6.00%"));
        assert!(out.contains('…'));
        assert!(!out.contains(long));
        assert!(out.contains("Found 2 significant changes"));
    }

    #[test]
    fn unknown_market_renders_not_found() {
        assert_eq!(
            render_market_lookup("0xdead", None),
            "Market not found: 0xdead\n"
        );
    }

    #[test]
    fn market_report_marks_unpriced_tokens() {
        let summary = MarketSummary {
            market: Market {
                condition_id: "c1".to_string(),
                question: "Q?".to_string(),
                description: None,
                end_date_iso: None,
                game_start_time: None,
                market_slug: None,
                rewards_min_size: None,
                rewards_max_spread: None,
                enable_order_book: true,
                active: true,
                closed: false,
                archived: false,
            },
            tokens: vec![crate::types::TokenSummary {
                token_id: "t".to_string(),
                outcome: "Yes".to_string(),
                current_price: None,
                timestamp_ns: None,
                change: None,
            }],
        };
        let out = render_market(&summary);
        assert!(out.contains("Active | Open"));
        assert!(out.contains("Market slug:  N/A"));
        assert!(out.lines().last().unwrap().contains("N/A"));
    }
}
