use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::db::models::{LatestPriceRow, MarketRow, PriceRow, TokenInfoRow, TokenRow};
use crate::db::store::{PriceReader, PriceWriter};
use crate::error::Result;
use crate::types::{Market, PriceObservation, StoreStats, Token, TokenInfo};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MARKET_COLUMNS: &str = r#"
    condition_id, question, description, end_date_iso, game_start_time, market_slug,
    rewards_min_size, rewards_max_spread, enable_order_book, active, closed, archived
"#;

/// SQLite-backed store. At-or-before lookups ride the `(token_id, timestamp DESC)` index.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `db_url` and apply migrations.
    pub async fn connect(db_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        info!("Database ready at {db_url}");

        Ok(Self { pool })
    }

    /// Private in-memory database. A single long-lived connection keeps the data alive.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl PriceReader for SqliteStore {
    async fn latest_price(&self, token_id: &str) -> Result<Option<PriceObservation>> {
        let row = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT token_id, condition_id, price, timestamp
            FROM price_history
            WHERE token_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PriceObservation::from))
    }

    async fn latest_price_at_or_before(
        &self,
        token_id: &str,
        cutoff_ns: i64,
    ) -> Result<Option<PriceObservation>> {
        let row = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT token_id, condition_id, price, timestamp
            FROM price_history
            WHERE token_id = ? AND timestamp <= ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(token_id)
        .bind(cutoff_ns)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PriceObservation::from))
    }

    async fn token_info(&self, token_id: &str) -> Result<Option<TokenInfo>> {
        let row = sqlx::query_as::<_, TokenInfoRow>(
            r#"
            SELECT m.condition_id, m.question, t.outcome
            FROM tokens t
            JOIN markets m ON t.condition_id = m.condition_id
            WHERE t.token_id = ?
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TokenInfo::from))
    }

    async fn tradeable_token_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT t.token_id
            FROM tokens t
            JOIN markets m ON t.condition_id = m.condition_id
            WHERE m.active = 1 AND m.closed = 0
            ORDER BY t.token_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn market(&self, condition_id: &str) -> Result<Option<Market>> {
        let sql = format!("SELECT {MARKET_COLUMNS} FROM markets WHERE condition_id = ?");
        let row = sqlx::query_as::<_, MarketRow>(&sql)
            .bind(condition_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Market::from))
    }

    async fn latest_prices_for_market(
        &self,
        condition_id: &str,
    ) -> Result<Vec<(Token, Option<PriceObservation>)>> {
        let rows = sqlx::query_as::<_, LatestPriceRow>(
            r#"
            SELECT t.token_id, t.condition_id, t.outcome,
                   latest.price AS price, latest.timestamp AS timestamp
            FROM tokens t
            LEFT JOIN price_history latest ON latest.id = (
                SELECT ph.id FROM price_history ph
                WHERE ph.token_id = t.token_id
                ORDER BY ph.timestamp DESC, ph.id DESC
                LIMIT 1
            )
            WHERE t.condition_id = ?
            ORDER BY t.rowid
            "#,
        )
        .bind(condition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LatestPriceRow::into_parts).collect())
    }

    async fn active_markets(&self) -> Result<Vec<Market>> {
        let sql = format!(
            "SELECT {MARKET_COLUMNS} FROM markets \
             WHERE active = 1 AND closed = 0 AND archived = 0 \
             ORDER BY updated_at DESC"
        );
        let rows = sqlx::query_as::<_, MarketRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Market::from).collect())
    }

    async fn tokens_for_market(&self, condition_id: &str) -> Result<Vec<Token>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT token_id, condition_id, outcome FROM tokens WHERE condition_id = ? ORDER BY rowid",
        )
        .bind(condition_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Token::from).collect())
    }

    async fn price_history(&self, token_id: &str, since_ns: i64) -> Result<Vec<PriceObservation>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT token_id, condition_id, price, timestamp
            FROM price_history
            WHERE token_id = ? AND timestamp >= ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(token_id)
        .bind(since_ns)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PriceObservation::from).collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let total_markets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM markets")
            .fetch_one(&self.pool)
            .await?;
        let active_markets: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM markets WHERE active = 1 AND closed = 0")
                .fetch_one(&self.pool)
                .await?;
        let total_tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await?;
        let total_price_points: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM price_history")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            total_markets,
            active_markets,
            total_tokens,
            total_price_points,
        })
    }
}

#[async_trait]
impl PriceWriter for SqliteStore {
    async fn upsert_market(&self, market: &Market) -> Result<()> {
        let now = now_ns();
        sqlx::query(
            r#"
            INSERT INTO markets (
                condition_id, question, description, end_date_iso, game_start_time,
                market_slug, rewards_min_size, rewards_max_spread, enable_order_book,
                active, closed, archived, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(condition_id) DO UPDATE SET
                question = excluded.question,
                description = excluded.description,
                end_date_iso = excluded.end_date_iso,
                game_start_time = excluded.game_start_time,
                market_slug = excluded.market_slug,
                rewards_min_size = excluded.rewards_min_size,
                rewards_max_spread = excluded.rewards_max_spread,
                enable_order_book = excluded.enable_order_book,
                active = excluded.active,
                closed = excluded.closed,
                archived = excluded.archived,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&market.condition_id)
        .bind(&market.question)
        .bind(&market.description)
        .bind(&market.end_date_iso)
        .bind(&market.game_start_time)
        .bind(&market.market_slug)
        .bind(market.rewards_min_size)
        .bind(market.rewards_max_spread)
        .bind(market.enable_order_book)
        .bind(market.active)
        .bind(market.closed)
        .bind(market.archived)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_token(&self, token: &Token) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO tokens (token_id, condition_id, outcome, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&token.token_id)
        .bind(&token.condition_id)
        .bind(&token.outcome)
        .bind(now_ns())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_price(&self, observation: &PriceObservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_history (token_id, condition_id, price, timestamp, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&observation.token_id)
        .bind(&observation.condition_id)
        .bind(observation.price)
        .bind(observation.timestamp_ns)
        .bind(now_ns())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn market(id: &str, active: bool, closed: bool, archived: bool) -> Market {
        Market {
            condition_id: id.to_string(),
            question: format!("Question {id}?"),
            description: None,
            end_date_iso: None,
            game_start_time: None,
            market_slug: Some(format!("slug-{id}")),
            rewards_min_size: None,
            rewards_max_spread: None,
            enable_order_book: true,
            active,
            closed,
            archived,
        }
    }

    fn token(id: &str, cid: &str, outcome: &str) -> Token {
        Token {
            token_id: id.to_string(),
            condition_id: cid.to_string(),
            outcome: outcome.to_string(),
        }
    }

    fn obs(token_id: &str, cid: &str, price: f64, ts: i64) -> PriceObservation {
        PriceObservation {
            token_id: token_id.to_string(),
            condition_id: cid.to_string(),
            price,
            timestamp_ns: ts,
        }
    }

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert_market(&market("m1", true, false, false)).await.unwrap();
        store.insert_token(&token("yes1", "m1", "Yes")).await.unwrap();
        store.insert_token(&token("no1", "m1", "No")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn latest_price_uses_max_timestamp_not_insert_order() {
        let store = seeded().await;
        store.insert_price(&obs("yes1", "m1", 0.50, 300)).await.unwrap();
        store.insert_price(&obs("yes1", "m1", 0.40, 100)).await.unwrap();
        store.insert_price(&obs("yes1", "m1", 0.45, 200)).await.unwrap();

        let latest = store.latest_price("yes1").await.unwrap().unwrap();
        assert_eq!(latest.timestamp_ns, 300);
        assert!((latest.price - 0.50).abs() < 1e-9);
    }

    #[tokio::test]
    async fn at_or_before_is_inclusive() {
        let store = seeded().await;
        store.insert_price(&obs("yes1", "m1", 0.40, 100)).await.unwrap();
        store.insert_price(&obs("yes1", "m1", 0.45, 200)).await.unwrap();

        let hit = store.latest_price_at_or_before("yes1", 200).await.unwrap().unwrap();
        assert_eq!(hit.timestamp_ns, 200);
        let hit = store.latest_price_at_or_before("yes1", 199).await.unwrap().unwrap();
        assert_eq!(hit.timestamp_ns, 100);
        assert!(store.latest_price_at_or_before("yes1", 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_timestamp_resolves_to_latest_insert() {
        let store = seeded().await;
        store.insert_price(&obs("yes1", "m1", 0.40, 100)).await.unwrap();
        store.insert_price(&obs("yes1", "m1", 0.42, 100)).await.unwrap();

        let latest = store.latest_price("yes1").await.unwrap().unwrap();
        assert!((latest.price - 0.42).abs() < 1e-9);
    }

    #[tokio::test]
    async fn upsert_market_overwrites_flags() {
        let store = seeded().await;
        store.upsert_market(&market("m1", true, true, false)).await.unwrap();

        let m = store.market("m1").await.unwrap().unwrap();
        assert!(m.closed);
        assert!(store.tradeable_token_ids().await.unwrap().is_empty());
        assert_eq!(store.stats().await.unwrap().total_markets, 1);
    }

    #[tokio::test]
    async fn insert_token_ignores_duplicates() {
        let store = seeded().await;
        store.insert_token(&token("yes1", "m1", "Renamed")).await.unwrap();

        let info = store.token_info("yes1").await.unwrap().unwrap();
        assert_eq!(info.outcome, "Yes");
        assert_eq!(info.question, "Question m1?");
        assert_eq!(store.stats().await.unwrap().total_tokens, 2);
    }

    #[tokio::test]
    async fn tradeable_tokens_include_archived_but_active_markets_do_not() {
        let store = seeded().await;
        store.upsert_market(&market("m2", true, false, true)).await.unwrap();
        store.insert_token(&token("yes2", "m2", "Yes")).await.unwrap();
        store.upsert_market(&market("m3", false, false, false)).await.unwrap();
        store.insert_token(&token("yes3", "m3", "Yes")).await.unwrap();

        let ids = store.tradeable_token_ids().await.unwrap();
        assert_eq!(ids, vec!["no1", "yes1", "yes2"]);

        let active: Vec<String> = store
            .active_markets()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.condition_id)
            .collect();
        assert_eq!(active, vec!["m1"]);
    }

    #[tokio::test]
    async fn latest_prices_for_market_keeps_unpriced_tokens() {
        let store = seeded().await;
        store.insert_price(&obs("yes1", "m1", 0.40, 100)).await.unwrap();
        store.insert_price(&obs("yes1", "m1", 0.55, 200)).await.unwrap();

        let rows = store.latest_prices_for_market("m1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.token_id, "yes1");
        assert_eq!(rows[0].1.as_ref().map(|o| o.timestamp_ns), Some(200));
        assert_eq!(rows[1].0.token_id, "no1");
        assert!(rows[1].1.is_none());
    }

    #[tokio::test]
    async fn price_history_is_newest_first_and_bounded() {
        let store = seeded().await;
        for (i, ts) in [100, 200, 300].into_iter().enumerate() {
            store.insert_price(&obs("yes1", "m1", 0.4 + i as f64 * 0.01, ts)).await.unwrap();
        }

        let history = store.price_history("yes1", 200).await.unwrap();
        let stamps: Vec<i64> = history.iter().map(|o| o.timestamp_ns).collect();
        assert_eq!(stamps, vec![300, 200]);
    }
}
