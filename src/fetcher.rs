use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{END_CURSOR, HTTP_TIMEOUT_SECS, PAGE_DELAY_MS};
use crate::error::{AppError, Result};
use crate::types::{Market, Token};

// ---------------------------------------------------------------------------
// Wire types (CLOB REST)
// ---------------------------------------------------------------------------

/// One page of `GET /markets`.
#[derive(Debug, Deserialize)]
pub struct MarketsPage {
    #[serde(default)]
    pub data: Vec<ClobMarket>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClobRewards {
    pub min_size: Option<f64>,
    pub max_spread: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClobToken {
    #[serde(default)]
    pub token_id: String,
    pub outcome: Option<String>,
}

/// Market object as served by the CLOB. Fields are optional because the API
/// omits or nulls them for older and not-yet-launched markets.
#[derive(Debug, Clone, Deserialize)]
pub struct ClobMarket {
    pub condition_id: Option<String>,
    pub question: Option<String>,
    pub description: Option<String>,
    pub end_date_iso: Option<String>,
    pub game_start_time: Option<String>,
    pub market_slug: Option<String>,
    pub rewards: Option<ClobRewards>,
    pub enable_order_book: Option<bool>,
    pub active: Option<bool>,
    pub closed: Option<bool>,
    pub archived: Option<bool>,
    #[serde(default)]
    pub tokens: Vec<ClobToken>,
}

impl ClobMarket {
    /// Split into storage records. None if the market has no condition id.
    pub fn into_parts(self) -> Option<(Market, Vec<Token>)> {
        let condition_id = self.condition_id.filter(|id| !id.is_empty())?;

        let tokens = self
            .tokens
            .into_iter()
            .filter(|t| !t.token_id.is_empty())
            .map(|t| Token {
                token_id: t.token_id,
                condition_id: condition_id.clone(),
                outcome: t.outcome.unwrap_or_else(|| "UNKNOWN".to_string()),
            })
            .collect();

        let market = Market {
            condition_id,
            question: self.question.unwrap_or_default(),
            description: self.description,
            end_date_iso: self.end_date_iso,
            game_start_time: self.game_start_time,
            market_slug: self.market_slug,
            rewards_min_size: self.rewards.as_ref().and_then(|r| r.min_size),
            rewards_max_spread: self.rewards.as_ref().and_then(|r| r.max_spread),
            enable_order_book: self.enable_order_book.unwrap_or(true),
            active: self.active.unwrap_or(true),
            closed: self.closed.unwrap_or(false),
            archived: self.archived.unwrap_or(false),
        };

        Some((market, tokens))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ClobClient {
    http: reqwest::Client,
    base_url: String,
}

impl ClobClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn markets_page(&self, cursor: Option<&str>) -> Result<MarketsPage> {
        let url = match cursor {
            Some(c) => format!("{}/markets?next_cursor={}", self.base_url, c),
            None => format!("{}/markets", self.base_url),
        };

        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "GET /markets returned {}",
                resp.status()
            )));
        }
        Ok(resp.json::<MarketsPage>().await?)
    }

    /// Walk `/markets` pages until the cursor runs out or `limit` markets are collected.
    ///
    /// A failure part way through is logged and the markets gathered so far are returned.
    pub async fn fetch_markets(&self, limit: Option<usize>) -> Vec<ClobMarket> {
        let mut markets = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 1usize;

        loop {
            let resp = match self.markets_page(cursor.as_deref()).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(page, fetched = markets.len(), "Error fetching markets: {e}");
                    break;
                }
            };

            if resp.data.is_empty() {
                break;
            }

            let page_len = resp.data.len();
            let reached_limit = merge_page(&mut markets, resp.data, limit);
            debug!(page, page_len, total = markets.len(), "Fetched markets page");
            if reached_limit {
                info!("Reached limit of {} markets", markets.len());
                break;
            }

            cursor = match resp.next_cursor {
                Some(c) if !c.is_empty() && c != END_CURSOR => Some(c),
                _ => break,
            };

            page += 1;
            tokio::time::sleep(Duration::from_millis(PAGE_DELAY_MS)).await;
        }

        info!(markets = markets.len(), pages = page, "Fetched markets from CLOB");
        markets
    }

    /// Current midpoint for a token. None if the API has no book for it.
    pub async fn fetch_midpoint(&self, token_id: &str) -> Option<f64> {
        let url = format!("{}/midpoint?token_id={}", self.base_url, token_id);
        let resp = match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(token_id, status = %r.status(), "No midpoint");
                return None;
            }
            Err(e) => {
                debug!(token_id, "Midpoint request failed: {e}");
                return None;
            }
        };

        match resp.json::<serde_json::Value>().await {
            Ok(v) => parse_mid(&v),
            Err(e) => {
                debug!(token_id, "Midpoint JSON parse error: {e}");
                None
            }
        }
    }
}

/// Append `page` to `markets`, stopping at `limit`. Returns true once the limit is hit.
fn merge_page(markets: &mut Vec<ClobMarket>, page: Vec<ClobMarket>, limit: Option<usize>) -> bool {
    match limit {
        Some(limit) => {
            let remaining = limit.saturating_sub(markets.len());
            markets.extend(page.into_iter().take(remaining));
            markets.len() >= limit
        }
        None => {
            markets.extend(page);
            false
        }
    }
}

/// `{"mid": "0.515"}`; the value is usually a string but numbers are accepted too.
pub fn parse_mid(v: &serde_json::Value) -> Option<f64> {
    let mid = v.get("mid")?;
    mid.as_f64()
        .or_else(|| mid.as_str().and_then(|s| s.parse::<f64>().ok()))
}
