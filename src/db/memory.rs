use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::store::{PriceReader, PriceWriter};
use crate::error::Result;
use crate::types::{Market, PriceObservation, StoreStats, Token, TokenInfo};

/// Series key: `(timestamp_ns, insert_seq)`. The sequence keeps duplicate
/// timestamps distinct and makes the latest insert win ties.
type SeriesKey = (i64, u64);

/// In-process store with the same read semantics as `SqliteStore`.
///
/// Each token's series is a `BTreeMap` ordered by timestamp, so "latest" is
/// `next_back()` and "latest at or before" is a range query. Referential
/// integrity is not enforced; callers insert markets and tokens first.
#[derive(Default)]
pub struct MemoryStore {
    /// condition_id → Market
    markets: DashMap<String, Market>,
    /// token_id → Token
    tokens: DashMap<String, Token>,
    /// condition_id → token ids in insertion order
    market_tokens: DashMap<String, Vec<String>>,
    /// token_id → observations ordered by (timestamp, seq)
    series: DashMap<String, BTreeMap<SeriesKey, PriceObservation>>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PriceReader for MemoryStore {
    async fn latest_price(&self, token_id: &str) -> Result<Option<PriceObservation>> {
        Ok(self
            .series
            .get(token_id)
            .and_then(|s| s.values().next_back().cloned()))
    }

    async fn latest_price_at_or_before(
        &self,
        token_id: &str,
        cutoff_ns: i64,
    ) -> Result<Option<PriceObservation>> {
        Ok(self.series.get(token_id).and_then(|s| {
            s.range(..=(cutoff_ns, u64::MAX))
                .next_back()
                .map(|(_, o)| o.clone())
        }))
    }

    async fn token_info(&self, token_id: &str) -> Result<Option<TokenInfo>> {
        let Some(token) = self.tokens.get(token_id).map(|t| t.clone()) else {
            return Ok(None);
        };
        Ok(self.markets.get(&token.condition_id).map(|m| TokenInfo {
            condition_id: m.condition_id.clone(),
            question: m.question.clone(),
            outcome: token.outcome,
        }))
    }

    async fn tradeable_token_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .market_tokens
            .iter()
            .filter(|entry| {
                self.markets
                    .get(entry.key())
                    .is_some_and(|m| m.is_tradeable())
            })
            .flat_map(|entry| entry.value().clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn market(&self, condition_id: &str) -> Result<Option<Market>> {
        Ok(self.markets.get(condition_id).map(|m| m.clone()))
    }

    async fn latest_prices_for_market(
        &self,
        condition_id: &str,
    ) -> Result<Vec<(Token, Option<PriceObservation>)>> {
        let tokens = self.tokens_for_market(condition_id).await?;
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            let latest = self.latest_price(&token.token_id).await?;
            out.push((token, latest));
        }
        Ok(out)
    }

    async fn active_markets(&self) -> Result<Vec<Market>> {
        let mut markets: Vec<Market> = self
            .markets
            .iter()
            .filter(|m| m.is_tradeable() && !m.archived)
            .map(|m| m.clone())
            .collect();
        markets.sort_by(|a, b| a.condition_id.cmp(&b.condition_id));
        Ok(markets)
    }

    async fn tokens_for_market(&self, condition_id: &str) -> Result<Vec<Token>> {
        let ids = self
            .market_tokens
            .get(condition_id)
            .map(|ids| ids.clone())
            .unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.tokens.get(id).map(|t| t.clone()))
            .collect())
    }

    async fn price_history(&self, token_id: &str, since_ns: i64) -> Result<Vec<PriceObservation>> {
        Ok(self
            .series
            .get(token_id)
            .map(|s| {
                s.range((since_ns, 0)..)
                    .rev()
                    .map(|(_, o)| o.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            total_markets: self.markets.len() as i64,
            active_markets: self.markets.iter().filter(|m| m.is_tradeable()).count() as i64,
            total_tokens: self.tokens.len() as i64,
            total_price_points: self.series.iter().map(|s| s.len() as i64).sum(),
        })
    }
}

#[async_trait]
impl PriceWriter for MemoryStore {
    async fn upsert_market(&self, market: &Market) -> Result<()> {
        self.markets
            .insert(market.condition_id.clone(), market.clone());
        Ok(())
    }

    async fn insert_token(&self, token: &Token) -> Result<()> {
        if self.tokens.contains_key(&token.token_id) {
            return Ok(());
        }
        self.tokens.insert(token.token_id.clone(), token.clone());
        self.market_tokens
            .entry(token.condition_id.clone())
            .or_default()
            .push(token.token_id.clone());
        Ok(())
    }

    async fn insert_price(&self, observation: &PriceObservation) -> Result<()> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.series
            .entry(observation.token_id.clone())
            .or_default()
            .insert((observation.timestamp_ns, seq), observation.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
