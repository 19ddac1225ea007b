use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub condition_id: String,
    pub question: String,
    pub description: Option<String>,
    pub end_date_iso: Option<String>,
    pub game_start_time: Option<String>,
    pub market_slug: Option<String>,
    pub rewards_min_size: Option<f64>,
    pub rewards_max_spread: Option<f64>,
    pub enable_order_book: bool,
    pub active: bool,
    pub closed: bool,
    pub archived: bool,
}

impl Market {
    /// Eligible for change analysis. Archived markets are not excluded here.
    pub fn is_tradeable(&self) -> bool {
        self.active && !self.closed
    }
}

/// One tradable outcome (YES/NO, team name, ...) of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: String,
    pub condition_id: String,
    pub outcome: String,
}

/// Question and outcome label a token resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenInfo {
    pub condition_id: String,
    pub question: String,
    pub outcome: String,
}

// ---------------------------------------------------------------------------
// Price series
// ---------------------------------------------------------------------------

/// A midpoint sample. Timestamps are nanosecond UTC epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub token_id: String,
    pub condition_id: String,
    pub price: f64,
    pub timestamp_ns: i64,
}

// ---------------------------------------------------------------------------
// Analysis output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub condition_id: String,
    pub question: String,
    pub token_id: String,
    pub outcome: String,
    pub old_price: f64,
    pub new_price: f64,
    pub change_percent: f64,
    pub change_absolute: f64,
    pub window_minutes: u32,
    pub old_timestamp_ns: i64,
    pub new_timestamp_ns: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Both,
}

impl Direction {
    pub fn next(self) -> Self {
        match self {
            Direction::Both => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Both,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Both => "both",
        };
        write!(f, "{s}")
    }
}

/// Per-market volatility rollup produced by the trending aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingMarket {
    pub condition_id: String,
    pub question: String,
    /// Largest |change %| among the market's tokens.
    pub max_change: f64,
    /// Sum of |change %| across the market's tokens.
    pub total_volatility: f64,
    pub num_changes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub token_id: String,
    pub outcome: String,
    /// None when the token has never been priced.
    pub current_price: Option<f64>,
    pub timestamp_ns: Option<i64>,
    pub change: Option<PriceChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market: Market,
    pub tokens: Vec<TokenSummary>,
}

// ---------------------------------------------------------------------------
// Ingestion / store bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub markets: usize,
    pub prices: usize,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_markets: i64,
    pub active_markets: i64,
    pub total_tokens: i64,
    pub total_price_points: i64,
}
