//! Storage seams. The analysis engine only ever sees `PriceReader`;
//! ingestion writes through `PriceWriter`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Market, PriceObservation, StoreStats, Token, TokenInfo};

#[async_trait]
pub trait PriceReader: Send + Sync {
    /// Observation with the greatest timestamp. Ties go to the latest insert.
    async fn latest_price(&self, token_id: &str) -> Result<Option<PriceObservation>>;

    /// Observation with the greatest timestamp that is `<= cutoff_ns`.
    async fn latest_price_at_or_before(
        &self,
        token_id: &str,
        cutoff_ns: i64,
    ) -> Result<Option<PriceObservation>>;

    async fn token_info(&self, token_id: &str) -> Result<Option<TokenInfo>>;

    /// Token ids of markets that are active and not closed, sorted by id.
    async fn tradeable_token_ids(&self) -> Result<Vec<String>>;

    async fn market(&self, condition_id: &str) -> Result<Option<Market>>;

    /// Every token of the market, in insertion order, with its latest observation.
    async fn latest_prices_for_market(
        &self,
        condition_id: &str,
    ) -> Result<Vec<(Token, Option<PriceObservation>)>>;

    /// Markets that are active, not closed and not archived. These are the
    /// ones ingestion polls prices for.
    async fn active_markets(&self) -> Result<Vec<Market>>;

    async fn tokens_for_market(&self, condition_id: &str) -> Result<Vec<Token>>;

    /// Observations at or after `since_ns`, newest first.
    async fn price_history(&self, token_id: &str, since_ns: i64) -> Result<Vec<PriceObservation>>;

    async fn stats(&self) -> Result<StoreStats>;
}

#[async_trait]
pub trait PriceWriter: Send + Sync {
    /// Insert or overwrite market metadata (latest wins).
    async fn upsert_market(&self, market: &Market) -> Result<()>;

    /// Insert a token unless one with the same id already exists.
    async fn insert_token(&self, token: &Token) -> Result<()>;

    async fn insert_price(&self, observation: &PriceObservation) -> Result<()>;
}
