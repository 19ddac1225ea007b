use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::db::{PriceReader, PriceWriter};
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::types::ScanReport;

/// Runs a full scan immediately, then once per interval. A failed scan is
/// logged and counted; the loop keeps going.
pub struct ScanScheduler<S> {
    ingestor: Ingestor<S>,
    health: Arc<HealthState>,
    period: Duration,
    market_limit: Option<usize>,
}

impl<S> ScanScheduler<S>
where
    S: PriceReader + PriceWriter,
{
    pub fn new(
        ingestor: Ingestor<S>,
        health: Arc<HealthState>,
        interval_secs: u64,
        market_limit: Option<usize>,
    ) -> Self {
        Self {
            ingestor,
            health,
            period: Duration::from_secs(interval_secs.max(1)),
            market_limit,
        }
    }

    pub async fn run(self) {
        info!(
            interval_secs = self.period.as_secs(),
            "Scan scheduler started"
        );
        let mut ticker = interval(self.period);
        // A scan can outlast the period; don't fire a burst to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!("Scheduled scan failed: {e}");
            }
        }
    }

    pub async fn run_once(&self) -> Result<ScanReport> {
        self.health.set_scanning(true);
        let result = self.ingestor.full_scan(self.market_limit).await;
        self.health.set_scanning(false);

        match &result {
            Ok(report) => self.health.record_success(report, now_ns()),
            Err(_) => self.health.record_failure(),
        }
        result
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
