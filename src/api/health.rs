//! Shared health state for the /health endpoint.
//! Updated by ScanScheduler after every scan.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

use crate::types::ScanReport;

/// Scan bookkeeping. Written by the scheduler, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// True while a scan is in flight.
    pub scanning: AtomicBool,
    /// Nanosecond timestamp of the last successful scan (0 = none).
    pub last_scan_at_ns: AtomicU64,
    pub scans_completed: AtomicU64,
    pub scans_failed: AtomicU64,
    pub last_scan_markets: AtomicU64,
    pub last_scan_prices: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub scanning: bool,
    pub last_scan_at_ns: Option<u64>,
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub last_scan_markets: u64,
    pub last_scan_prices: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scanning(&self, v: bool) {
        self.scanning.store(v, Ordering::Relaxed);
    }

    pub fn record_success(&self, report: &ScanReport, at_ns: u64) {
        self.last_scan_at_ns.store(at_ns, Ordering::Relaxed);
        self.last_scan_markets
            .store(report.markets as u64, Ordering::Relaxed);
        self.last_scan_prices
            .store(report.prices as u64, Ordering::Relaxed);
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.scans_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn scanning(&self) -> bool {
        self.scanning.load(Ordering::Relaxed)
    }

    pub fn last_scan_at_ns(&self) -> u64 {
        self.last_scan_at_ns.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let last = self.last_scan_at_ns();
        let completed = self.scans_completed.load(Ordering::Relaxed);
        HealthSnapshot {
            status: if completed > 0 { "ok" } else { "starting" },
            scanning: self.scanning(),
            last_scan_at_ns: (last > 0).then_some(last),
            scans_completed: completed,
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            last_scan_markets: self.last_scan_markets.load(Ordering::Relaxed),
            last_scan_prices: self.last_scan_prices.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_scans() {
        let health = HealthState::new();
        assert_eq!(health.snapshot().status, "starting");
        assert_eq!(health.snapshot().last_scan_at_ns, None);

        health.record_failure();
        health.record_success(
            &ScanReport { markets: 12, prices: 24, elapsed_secs: 1.5 },
            42,
        );

        let snap = health.snapshot();
        assert_eq!(snap.status, "ok");
        assert_eq!(snap.last_scan_at_ns, Some(42));
        assert_eq!(snap.scans_completed, 1);
        assert_eq!(snap.scans_failed, 1);
        assert_eq!(snap.last_scan_markets, 12);
        assert_eq!(snap.last_scan_prices, 24);
    }
}
