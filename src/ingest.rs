use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::config::PRICE_DELAY_MS;
use crate::db::{PriceReader, PriceWriter};
use crate::error::Result;
use crate::fetcher::{ClobClient, ClobMarket};
use crate::types::{PriceObservation, ScanReport};

/// Pulls markets and midpoints from the CLOB and appends them to the store.
pub struct Ingestor<S> {
    client: ClobClient,
    store: Arc<S>,
}

impl<S> Ingestor<S>
where
    S: PriceReader + PriceWriter,
{
    pub fn new(client: ClobClient, store: Arc<S>) -> Self {
        Self { client, store }
    }

    /// Fetch markets (all, or up to `limit`) and upsert them with their tokens.
    pub async fn scan_and_store_markets(&self, limit: Option<usize>) -> Result<usize> {
        let markets = self.client.fetch_markets(limit).await;
        let stored = persist_markets(&*self.store, markets).await;
        info!(stored, "Stored markets");
        Ok(stored)
    }

    /// Record a midpoint for every token of every active, open, unarchived market.
    pub async fn scan_and_store_prices(&self) -> Result<usize> {
        let markets = self.store.active_markets().await?;
        if markets.is_empty() {
            warn!("No active markets found; run a market scan first");
            return Ok(0);
        }

        let mut stored = 0usize;
        let mut errors = 0usize;

        for market in &markets {
            let tokens = self.store.tokens_for_market(&market.condition_id).await?;
            for token in &tokens {
                if let Some(price) = self.client.fetch_midpoint(&token.token_id).await {
                    let observation = PriceObservation {
                        token_id: token.token_id.clone(),
                        condition_id: market.condition_id.clone(),
                        price,
                        timestamp_ns: now_ns(),
                    };
                    match self.store.insert_price(&observation).await {
                        Ok(()) => stored += 1,
                        Err(e) => {
                            errors += 1;
                            warn!(token_id = %token.token_id, "Price insert failed: {e}");
                        }
                    }
                }
                tokio::time::sleep(Duration::from_millis(PRICE_DELAY_MS)).await;
            }
        }

        info!(stored, errors, "Stored price points");
        Ok(stored)
    }

    /// Markets, then prices.
    pub async fn full_scan(&self, market_limit: Option<usize>) -> Result<ScanReport> {
        let started = Instant::now();
        info!(market_limit = ?market_limit, "Starting full scan");

        let markets = self.scan_and_store_markets(market_limit).await?;
        let prices = self.scan_and_store_prices().await?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        info!(
            event = "SCAN_COMPLETE",
            markets,
            prices,
            elapsed_secs,
            "Scan completed in {elapsed_secs:.2}s: {markets} markets, {prices} prices",
        );

        Ok(ScanReport {
            markets,
            prices,
            elapsed_secs,
        })
    }
}

/// Upsert each market and insert its tokens. Markets that fail to parse or
/// persist are logged and skipped. Returns how many were stored.
pub async fn persist_markets<S>(store: &S, markets: Vec<ClobMarket>) -> usize
where
    S: PriceWriter + ?Sized,
{
    let mut stored = 0usize;

    for raw in markets {
        let Some((market, tokens)) = raw.into_parts() else {
            warn!("Skipping market without condition_id");
            continue;
        };

        if let Err(e) = store.upsert_market(&market).await {
            warn!(condition_id = %market.condition_id, "Error storing market: {e}");
            continue;
        }

        let mut token_failed = false;
        for token in &tokens {
            if let Err(e) = store.insert_token(token).await {
                warn!(
                    condition_id = %market.condition_id,
                    token_id = %token.token_id,
                    "Error storing token: {e}"
                );
                token_failed = true;
                break;
            }
        }

        if !token_failed {
            stored += 1;
        }
    }

    stored
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}
