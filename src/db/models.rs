/// Database row types matching `migrations/0001_init.sql`.
/// Used by sqlx for typed queries; converted to domain types before leaving the db module.
use crate::types::{Market, PriceObservation, Token, TokenInfo};

#[derive(Debug, sqlx::FromRow)]
pub struct MarketRow {
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

impl From<MarketRow> for Market {
    fn from(r: MarketRow) -> Self {
        Market {
            condition_id: r.condition_id,
            question: r.question,
            description: r.description,
            end_date_iso: r.end_date_iso,
            game_start_time: r.game_start_time,
            market_slug: r.market_slug,
            rewards_min_size: r.rewards_min_size,
            rewards_max_spread: r.rewards_max_spread,
            enable_order_book: r.enable_order_book,
            active: r.active,
            closed: r.closed,
            archived: r.archived,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TokenRow {
    pub token_id: String,
    pub condition_id: String,
    pub outcome: String,
}

impl From<TokenRow> for Token {
    fn from(r: TokenRow) -> Self {
        Token {
            token_id: r.token_id,
            condition_id: r.condition_id,
            outcome: r.outcome,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PriceRow {
    pub token_id: String,
    pub condition_id: String,
    pub price: f64,
    pub timestamp: i64,
}

impl From<PriceRow> for PriceObservation {
    fn from(r: PriceRow) -> Self {
        PriceObservation {
            token_id: r.token_id,
            condition_id: r.condition_id,
            price: r.price,
            timestamp_ns: r.timestamp,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TokenInfoRow {
    pub condition_id: String,
    pub question: String,
    pub outcome: String,
}

impl From<TokenInfoRow> for TokenInfo {
    fn from(r: TokenInfoRow) -> Self {
        TokenInfo {
            condition_id: r.condition_id,
            question: r.question,
            outcome: r.outcome,
        }
    }
}

/// A market's token joined with its most recent observation, if any.
#[derive(Debug, sqlx::FromRow)]
pub struct LatestPriceRow {
    pub token_id: String,
    pub condition_id: String,
    pub outcome: String,
    pub price: Option<f64>,
    pub timestamp: Option<i64>,
}

impl LatestPriceRow {
    pub fn into_parts(self) -> (Token, Option<PriceObservation>) {
        let latest = match (self.price, self.timestamp) {
            (Some(price), Some(timestamp_ns)) => Some(PriceObservation {
                token_id: self.token_id.clone(),
                condition_id: self.condition_id.clone(),
                price,
                timestamp_ns,
            }),
            _ => None,
        };
        let token = Token {
            token_id: self.token_id,
            condition_id: self.condition_id,
            outcome: self.outcome,
        };
        (token, latest)
    }
}
