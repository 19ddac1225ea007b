use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::analysis::MarketAnalyzer;
use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::{LatencySnapshot, LatencyStats};
use crate::config::{DEFAULT_CHANGES_LIMIT, DEFAULT_MOVERS_LIMIT, DEFAULT_TRENDING_LIMIT};
use crate::db::PriceReader;
use crate::error::AppError;
use crate::types::{Direction, MarketSummary, PriceChange, StoreStats, TrendingMarket};

const DEFAULT_HISTORY_HOURS: u32 = 24;
const NANOS_PER_HOUR: i64 = 3_600 * 1_000_000_000;

#[derive(Clone)]
pub struct ApiState {
    pub analyzer: MarketAnalyzer<dyn PriceReader>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/changes", get(get_changes))
        .route("/movers", get(get_movers))
        .route("/trending", get(get_trending))
        .route("/markets/:id", get(get_market))
        .route("/tokens/:id/history", get(get_token_history))
        .route("/stats/summary", get(get_stats_summary))
        .route("/stats/latency", get(get_stats_latency))
        .route("/health", get(get_health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    pub threshold: Option<f64>,
    pub window: Option<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoversQuery {
    pub window: Option<u32>,
    pub limit: Option<usize>,
    pub direction: Option<Direction>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub window: Option<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<u32>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub price: f64,
    pub timestamp_ns: i64,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub token_id: String,
    pub hours: u32,
    pub points: Vec<HistoryPoint>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_changes(
    State(state): State<ApiState>,
    Query(params): Query<ChangesQuery>,
) -> Result<Json<Vec<PriceChange>>, AppError> {
    let started = Instant::now();
    let changes = state
        .analyzer
        .find_significant_changes(
            params.threshold,
            params.window,
            params.limit.unwrap_or(DEFAULT_CHANGES_LIMIT),
        )
        .await?;
    state.latency.record(started.elapsed());
    Ok(Json(changes))
}

async fn get_movers(
    State(state): State<ApiState>,
    Query(params): Query<MoversQuery>,
) -> Result<Json<Vec<PriceChange>>, AppError> {
    let started = Instant::now();
    let movers = state
        .analyzer
        .get_top_movers(
            params.window,
            params.limit.unwrap_or(DEFAULT_MOVERS_LIMIT),
            params.direction.unwrap_or_default(),
        )
        .await?;
    state.latency.record(started.elapsed());
    Ok(Json(movers))
}

async fn get_trending(
    State(state): State<ApiState>,
    Query(params): Query<TrendingQuery>,
) -> Result<Json<Vec<TrendingMarket>>, AppError> {
    let started = Instant::now();
    let trending = state
        .analyzer
        .get_trending_markets(
            params.window,
            params.limit.unwrap_or(DEFAULT_TRENDING_LIMIT),
        )
        .await?;
    state.latency.record(started.elapsed());
    Ok(Json(trending))
}

async fn get_market(
    State(state): State<ApiState>,
    Path(condition_id): Path<String>,
) -> Result<Json<MarketSummary>, AppError> {
    let started = Instant::now();
    let summary = state.analyzer.get_market_summary(&condition_id).await?;
    state.latency.record(started.elapsed());

    summary
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("market {condition_id}")))
}

async fn get_token_history(
    State(state): State<ApiState>,
    Path(token_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let hours = params.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    let since_ns = now_ns().saturating_sub(i64::from(hours).saturating_mul(NANOS_PER_HOUR));

    let points = state
        .analyzer
        .store()
        .price_history(&token_id, since_ns)
        .await?
        .into_iter()
        .map(|o| HistoryPoint {
            price: o.price,
            timestamp_ns: o.timestamp_ns,
        })
        .collect();

    Ok(Json(HistoryResponse {
        token_id,
        hours,
        points,
    }))
}

async fn get_stats_summary(State(state): State<ApiState>) -> Result<Json<StoreStats>, AppError> {
    Ok(Json(state.analyzer.store().stats().await?))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySnapshot> {
    Json(state.latency.snapshot())
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::db::{MemoryStore, PriceWriter};
    use crate::types::{Market, PriceObservation, Token};

    const MIN: i64 = 60 * 1_000_000_000;

    async fn state() -> ApiState {
        let store = MemoryStore::new();
        store
            .upsert_market(&Market {
                condition_id: "m1".to_string(),
                question: "Will it rain?".to_string(),
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
            })
            .await
            .unwrap();
        for (token_id, outcome, old, new) in [("y", "Yes", 0.40, 0.50), ("n", "No", 0.60, 0.50)] {
            store
                .insert_token(&Token {
                    token_id: token_id.to_string(),
                    condition_id: "m1".to_string(),
                    outcome: outcome.to_string(),
                })
                .await
                .unwrap();
            let now = now_ns();
            for (price, ts) in [(old, now - 90 * MIN), (new, now - MIN)] {
                store
                    .insert_price(&PriceObservation {
                        token_id: token_id.to_string(),
                        condition_id: "m1".to_string(),
                        price,
                        timestamp_ns: ts,
                    })
                    .await
                    .unwrap();
            }
        }

        let store: Arc<dyn PriceReader> = store;
        ApiState {
            analyzer: MarketAnalyzer::new(store, AnalysisConfig::default()),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        }
    }

    #[tokio::test]
    async fn movers_filter_by_direction_and_record_latency() {
        let state = state().await;
        let Json(movers) = get_movers(
            State(state.clone()),
            Query(MoversQuery {
                direction: Some(Direction::Down),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(movers.len(), 1);
        assert_eq!(movers[0].token_id, "n");
        assert_eq!(state.latency.len(), 1);
    }

    #[tokio::test]
    async fn changes_and_trending_use_defaults() {
        let state = state().await;
        let Json(changes) = get_changes(State(state.clone()), Query(ChangesQuery::default()))
            .await
            .unwrap();
        // +25% and -16.7% both clear the 5% default threshold.
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].token_id, "y");

        let Json(trending) = get_trending(State(state), Query(TrendingQuery::default()))
            .await
            .unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].num_changes, 2);
    }

    #[tokio::test]
    async fn unknown_market_is_not_found() {
        let state = state().await;
        let err = get_market(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let state = state().await;
        let Json(history) = get_token_history(
            State(state.clone()),
            Path("y".to_string()),
            Query(HistoryQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(history.hours, 24);
        assert_eq!(history.points.len(), 2);
        assert_eq!(history.points[0].price, 0.50);

        let Json(recent) = get_token_history(
            State(state),
            Path("y".to_string()),
            Query(HistoryQuery { hours: Some(1) }),
        )
        .await
        .unwrap();
        assert_eq!(recent.points.len(), 1);
    }

    #[tokio::test]
    async fn huge_history_window_returns_everything() {
        let state = state().await;
        let Json(history) = get_token_history(
            State(state),
            Path("y".to_string()),
            Query(HistoryQuery { hours: Some(u32::MAX) }),
        )
        .await
        .unwrap();
        assert_eq!(history.points.len(), 2);
    }

    #[tokio::test]
    async fn stats_summary_counts_store() {
        let state = state().await;
        let Json(stats) = get_stats_summary(State(state)).await.unwrap();
        assert_eq!(stats.total_markets, 1);
        assert_eq!(stats.active_markets, 1);
        assert_eq!(stats.total_tokens, 2);
        assert_eq!(stats.total_price_points, 4);
    }
}
