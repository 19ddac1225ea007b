use crate::error::{AppError, Result};

pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

/// Cursor the CLOB API returns once the last page of `/markets` has been served.
pub const END_CURSOR: &str = "LTE=";

/// Delay between `/markets` pages (milliseconds).
pub const PAGE_DELAY_MS: u64 = 100;

/// Delay between per-token `/midpoint` requests (milliseconds).
pub const PRICE_DELAY_MS: u64 = 50;

/// Upstream HTTP request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Default row caps for the analytics entry points.
pub const DEFAULT_CHANGES_LIMIT: usize = 50;
pub const DEFAULT_MOVERS_LIMIT: usize = 20;
pub const DEFAULT_TRENDING_LIMIT: usize = 10;

/// Trending markets are aggregated from a wide first pass that ignores the
/// caller's threshold and limit. Changing either value changes the ranking.
pub mod trending {
    pub const THRESHOLD_PERCENT: f64 = 1.0;
    pub const SCAN_CAP: usize = 1000;
}

pub const NANOS_PER_MINUTE: i64 = 60 * 1_000_000_000;

/// Defaults handed to every analysis call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    /// Minimum |change %| for `find_significant_changes` (DEFAULT_CHANGE_THRESHOLD).
    pub threshold_percent: f64,
    /// Trailing window in minutes (TIME_WINDOW_MINUTES).
    pub window_minutes: u32,
}

impl AnalysisConfig {
    /// Resolve an optional window. `None` and zero both mean "use the default".
    pub fn window_or_default(&self, window_minutes: Option<u32>) -> u32 {
        match window_minutes {
            Some(w) if w > 0 => w,
            _ => self.window_minutes,
        }
    }

    /// Resolve an optional threshold. `None` and zero both mean "use the default".
    pub fn threshold_or_default(&self, threshold_percent: Option<f64>) -> f64 {
        match threshold_percent {
            Some(t) if t != 0.0 => t,
            _ => self.threshold_percent,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 5.0,
            window_minutes: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub clob_api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Seconds between scheduled scans (SCAN_INTERVAL_SECONDS)
    pub scan_interval_secs: u64,
    /// Cap on markets fetched per scan (MARKET_LIMIT). None = fetch everything.
    pub market_limit: Option<usize>,
    pub analysis: AnalysisConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            clob_api_url: std::env::var("CLOB_API_URL")
                .unwrap_or_else(|_| CLOB_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "polymarket_data.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            scan_interval_secs: std::env::var("SCAN_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("SCAN_INTERVAL_SECONDS must be a whole number".to_string())
                })?,
            market_limit: match std::env::var("MARKET_LIMIT") {
                Ok(v) if !v.trim().is_empty() => Some(v.trim().parse::<usize>().map_err(|_| {
                    AppError::Config("MARKET_LIMIT must be a whole number".to_string())
                })?),
                _ => None,
            },
            analysis: AnalysisConfig {
                threshold_percent: std::env::var("DEFAULT_CHANGE_THRESHOLD")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse::<f64>()
                    .map_err(|_| {
                        AppError::Config("DEFAULT_CHANGE_THRESHOLD must be a number".to_string())
                    })?,
                window_minutes: std::env::var("TIME_WINDOW_MINUTES")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse::<u32>()
                    .map_err(|_| {
                        AppError::Config("TIME_WINDOW_MINUTES must be a whole number".to_string())
                    })?,
            },
        })
    }

    pub fn db_url(&self) -> String {
        format!("sqlite:{}", self.db_path)
    }
}
