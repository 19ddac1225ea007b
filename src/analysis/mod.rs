//! Time-windowed price-change analytics over the stored price series.
//!
//! Every call re-reads storage; nothing is cached between calls.

pub mod change;
pub mod movers;
pub mod significant;
pub mod summary;
pub mod trending;

use std::sync::Arc;

use tracing::debug;

use crate::config::trending::{SCAN_CAP, THRESHOLD_PERCENT};
use crate::config::AnalysisConfig;
use crate::db::PriceReader;
use crate::error::Result;
use crate::types::{Direction, MarketSummary, PriceChange, TrendingMarket};

pub use change::{calculate_price_change, price_delta, tradeable_changes};
pub use movers::rank_movers;
pub use significant::rank_significant;
pub use trending::aggregate_trending;

/// Entry points consumed by the CLI, HTTP API and TUI.
pub struct MarketAnalyzer<S: ?Sized> {
    store: Arc<S>,
    config: AnalysisConfig,
}

impl<S: ?Sized> Clone for MarketAnalyzer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S> MarketAnalyzer<S>
where
    S: PriceReader + ?Sized,
{
    pub fn new(store: Arc<S>, config: AnalysisConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn calculate_price_change(
        &self,
        token_id: &str,
        window_minutes: u32,
    ) -> Result<Option<PriceChange>> {
        calculate_price_change(&*self.store, token_id, window_minutes).await
    }

    /// Tokens whose |change %| over the window meets the threshold, largest first.
    pub async fn find_significant_changes(
        &self,
        threshold_percent: Option<f64>,
        window_minutes: Option<u32>,
        limit: usize,
    ) -> Result<Vec<PriceChange>> {
        let threshold = self.config.threshold_or_default(threshold_percent);
        let window = self.config.window_or_default(window_minutes);

        let changes = tradeable_changes(&*self.store, window).await?;
        let significant = rank_significant(changes, threshold, limit);

        debug!(
            threshold,
            window_minutes = window,
            found = significant.len(),
            "Significant change scan complete"
        );
        Ok(significant)
    }

    pub async fn get_top_movers(
        &self,
        window_minutes: Option<u32>,
        limit: usize,
        direction: Direction,
    ) -> Result<Vec<PriceChange>> {
        let window = self.config.window_or_default(window_minutes);
        let changes = tradeable_changes(&*self.store, window).await?;
        Ok(rank_movers(changes, direction, limit))
    }

    pub async fn get_market_summary(&self, condition_id: &str) -> Result<Option<MarketSummary>> {
        summary::market_summary(&*self.store, condition_id, self.config.window_minutes).await
    }

    /// Markets ranked by summed token volatility.
    ///
    /// Aggregates over a fixed wide pass (1% threshold, 1000 rows) regardless
    /// of `limit`, then truncates the per-market list.
    pub async fn get_trending_markets(
        &self,
        window_minutes: Option<u32>,
        limit: usize,
    ) -> Result<Vec<TrendingMarket>> {
        let changes = self
            .find_significant_changes(Some(THRESHOLD_PERCENT), window_minutes, SCAN_CAP)
            .await?;
        Ok(aggregate_trending(&changes, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NANOS_PER_MINUTE;
    use crate::db::{MemoryStore, PriceWriter, SqliteStore};
    use crate::types::{Market, PriceObservation, Token};

    const MIN: i64 = NANOS_PER_MINUTE;
    const T0: i64 = 1_700_000_000_000_000_000;

    fn market(id: &str, active: bool, closed: bool) -> Market {
        Market {
            condition_id: id.to_string(),
            question: format!("Question {id}?"),
            description: Some("desc".to_string()),
            end_date_iso: Some("2030-01-01T00:00:00Z".to_string()),
            game_start_time: None,
            market_slug: Some(format!("slug-{id}")),
            rewards_min_size: None,
            rewards_max_spread: None,
            enable_order_book: true,
            active,
            closed,
            archived: false,
        }
    }

    /// Two-point series: `old` at T0, `new` at T0 + 90 minutes.
    async fn seed_token<W: PriceWriter + ?Sized>(
        store: &W,
        cid: &str,
        token_id: &str,
        outcome: &str,
        old: f64,
        new: f64,
    ) {
        store
            .insert_token(&Token {
                token_id: token_id.to_string(),
                condition_id: cid.to_string(),
                outcome: outcome.to_string(),
            })
            .await
            .unwrap();
        for (price, ts) in [(old, T0), (new, T0 + 90 * MIN)] {
            store
                .insert_price(&PriceObservation {
                    token_id: token_id.to_string(),
                    condition_id: cid.to_string(),
                    price,
                    timestamp_ns: ts,
                })
                .await
                .unwrap();
        }
    }

    /// m1: A +3%, B -7%. m2: C +20%. m3 (closed): D +50%. m4: E +0.5%.
    async fn seed<W: PriceWriter + ?Sized>(store: &W) {
        store.upsert_market(&market("m1", true, false)).await.unwrap();
        store.upsert_market(&market("m2", true, false)).await.unwrap();
        store.upsert_market(&market("m3", true, true)).await.unwrap();
        store.upsert_market(&market("m4", true, false)).await.unwrap();
        seed_token(store, "m1", "A", "Yes", 0.50, 0.515).await;
        seed_token(store, "m1", "B", "No", 0.50, 0.465).await;
        seed_token(store, "m2", "C", "Yes", 0.25, 0.30).await;
        seed_token(store, "m3", "D", "Yes", 0.20, 0.30).await;
        seed_token(store, "m4", "E", "Yes", 0.40, 0.402).await;
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig { threshold_percent: 5.0, window_minutes: 60 }
    }

    async fn memory_analyzer() -> MarketAnalyzer<MemoryStore> {
        let store = MemoryStore::new();
        seed(&*store).await;
        MarketAnalyzer::new(store, config())
    }

    #[tokio::test]
    async fn significant_changes_respect_threshold_and_skip_closed_markets() {
        let analyzer = memory_analyzer().await;
        let out = analyzer.find_significant_changes(None, None, 50).await.unwrap();

        let ids: Vec<&str> = out.iter().map(|c| c.token_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B"]);
        assert!(out.iter().all(|c| c.change_percent.abs() >= 5.0));
    }

    #[tokio::test]
    async fn explicit_threshold_overrides_default() {
        let analyzer = memory_analyzer().await;
        let out = analyzer.find_significant_changes(Some(1.0), Some(60), 50).await.unwrap();
        let ids: Vec<&str> = out.iter().map(|c| c.token_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn wide_window_yields_no_data_not_error() {
        let analyzer = memory_analyzer().await;
        let out = analyzer.find_significant_changes(None, Some(120), 50).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn top_movers_by_direction() {
        let analyzer = memory_analyzer().await;

        let up = analyzer.get_top_movers(None, 10, Direction::Up).await.unwrap();
        let up_ids: Vec<&str> = up.iter().map(|c| c.token_id.as_str()).collect();
        assert_eq!(up_ids, vec!["C", "A", "E"]);

        let down = analyzer.get_top_movers(None, 10, Direction::Down).await.unwrap();
        let down_ids: Vec<&str> = down.iter().map(|c| c.token_id.as_str()).collect();
        assert_eq!(down_ids, vec!["B"]);

        let both = analyzer.get_top_movers(None, 2, Direction::Both).await.unwrap();
        let both_ids: Vec<&str> = both.iter().map(|c| c.token_id.as_str()).collect();
        assert_eq!(both_ids, vec!["C", "B"]);
    }

    #[tokio::test]
    async fn trending_uses_wide_internal_threshold() {
        let analyzer = memory_analyzer().await;
        let out = analyzer.get_trending_markets(None, 10).await.unwrap();

        let ids: Vec<&str> = out.iter().map(|m| m.condition_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1"]);

        let m1 = &out[1];
        assert!((m1.max_change - 7.0).abs() < 1e-6);
        assert!((m1.total_volatility - 10.0).abs() < 1e-6);
        assert_eq!(m1.num_changes, 2);
    }

    #[tokio::test]
    async fn market_summary_lists_tokens_with_changes() {
        let analyzer = memory_analyzer().await;
        let summary = analyzer.get_market_summary("m1").await.unwrap().unwrap();

        assert_eq!(summary.market.condition_id, "m1");
        assert_eq!(summary.tokens.len(), 2);
        assert_eq!(summary.tokens[0].outcome, "Yes");
        assert_eq!(summary.tokens[0].current_price, Some(0.515));
        assert_eq!(summary.tokens[0].timestamp_ns, Some(T0 + 90 * MIN));
        let change = summary.tokens[0].change.as_ref().unwrap();
        assert!((change.change_percent - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn market_summary_unknown_is_none() {
        let analyzer = memory_analyzer().await;
        assert!(analyzer.get_market_summary("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn market_summary_unpriced_token_has_no_price_or_change() {
        let analyzer = memory_analyzer().await;
        analyzer
            .store()
            .insert_token(&Token {
                token_id: "F".to_string(),
                condition_id: "m2".to_string(),
                outcome: "No".to_string(),
            })
            .await
            .unwrap();

        let summary = analyzer.get_market_summary("m2").await.unwrap().unwrap();
        let unpriced = summary.tokens.iter().find(|t| t.token_id == "F").unwrap();
        assert!(unpriced.current_price.is_none());
        assert!(unpriced.timestamp_ns.is_none());
        assert!(unpriced.change.is_none());
    }

    #[tokio::test]
    async fn sqlite_and_memory_agree() {
        let sqlite = Arc::new(SqliteStore::in_memory().await.unwrap());
        seed(&*sqlite).await;
        let from_sqlite = MarketAnalyzer::new(sqlite, config());
        let from_memory = memory_analyzer().await;

        assert_eq!(
            from_sqlite.get_top_movers(None, 10, Direction::Both).await.unwrap(),
            from_memory.get_top_movers(None, 10, Direction::Both).await.unwrap(),
        );
        assert_eq!(
            from_sqlite.get_trending_markets(None, 10).await.unwrap(),
            from_memory.get_trending_markets(None, 10).await.unwrap(),
        );
    }
}
