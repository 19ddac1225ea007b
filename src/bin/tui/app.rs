use serde::Deserialize;

use polymarket_movers::types::{Direction, PriceChange, StoreStats, TrendingMarket};

pub const MOVERS_LIMIT: usize = 30;
pub const TRENDING_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// API response types (mirror api/health.rs and api/latency.rs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct HealthResponse {
    pub status: Option<String>,
    pub scanning: Option<bool>,
    pub last_scan_at_ns: Option<i64>,
    pub scans_completed: Option<u64>,
    pub scans_failed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LatencyResponse {
    pub samples: Option<u64>,
    pub p99_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub stats: StoreStats,
    pub movers: Vec<PriceChange>,
    pub trending: Vec<TrendingMarket>,
    pub direction: Direction,
    pub health: HealthResponse,
    pub latency: LatencyResponse,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            stats: StoreStats::default(),
            movers: Vec::new(),
            trending: Vec::new(),
            direction: Direction::Both,
            health: HealthResponse::default(),
            latency: LatencyResponse::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn cycle_direction(&mut self) {
        self.direction = self.direction.next();
    }

    pub fn movers_url(&self) -> String {
        format!(
            "{}/movers?limit={}&direction={}",
            self.base_url, MOVERS_LIMIT, self.direction
        )
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let stats_url = format!("{}/stats/summary", self.base_url);
        let movers_url = self.movers_url();
        let trending_url = format!("{}/trending?limit={}", self.base_url, TRENDING_LIMIT);
        let health_url = format!("{}/health", self.base_url);
        let latency_url = format!("{}/stats/latency", self.base_url);

        let (stats_res, movers_res, trending_res, health_res, latency_res) = tokio::join!(
            client.get(&stats_url).send(),
            client.get(&movers_url).send(),
            client.get(&trending_url).send(),
            client.get(&health_url).send(),
            client.get(&latency_url).send(),
        );

        let (stats_resp, movers_resp, trending_resp) = match (stats_res, movers_res, trending_res) {
            (Ok(s), Ok(m), Ok(t)) => (s, m, t),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        let (stats, movers, trending) = tokio::join!(
            stats_resp.json::<StoreStats>(),
            movers_resp.json::<Vec<PriceChange>>(),
            trending_resp.json::<Vec<TrendingMarket>>(),
        );

        match (stats, movers, trending) {
            (Ok(s), Ok(m), Ok(t)) => {
                self.stats = s;
                self.movers = m;
                self.trending = t;
                self.status = ConnectionStatus::Connected;

                if let Ok(h) = health_res {
                    if let Ok(health) = h.json::<HealthResponse>().await {
                        self.health = health;
                    }
                }
                if let Ok(l) = latency_res {
                    if let Ok(latency) = l.json::<LatencyResponse>().await {
                        self.latency = latency;
                    }
                }
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}
