//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - The conversion service
//! - Conversion permits bounding concurrent encoder processes
//! - The shutdown token that in-flight conversions derive from
//! - Conversion counters

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::conversion::ConversionService;

/// Conversion counters
#[derive(Debug, Default)]
pub struct ConversionStats {
    pub started: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
}

impl ConversionStats {
    fn record_finished(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A conversion counted as in flight.
///
/// Dropped without [`InFlightGuard::finish`] (the handler future went away
/// mid-conversion) it is counted as failed.
#[derive(Debug)]
#[must_use = "dropping the guard counts the conversion as failed"]
pub struct InFlightGuard<'a> {
    stats: &'a ConversionStats,
    settled: bool,
}

impl InFlightGuard<'_> {
    pub fn finish(mut self, success: bool) {
        self.settled = true;
        self.stats.record_finished(success);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.stats.record_finished(false);
        }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub in_flight: u64,
    pub available_permits: usize,
    pub started_at: DateTime<Utc>,
    pub encoder_version: Option<String>,
}

/// Shared state for all handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: ConversionService,
    pub stats: ConversionStats,
    pub encoder_version: Option<String>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let service = ConversionService::from_config(&config.encoder);
        let permits = Arc::new(Semaphore::new(config.limits.max_concurrent_conversions.max(1)));
        Self {
            config,
            service,
            stats: ConversionStats::default(),
            encoder_version: None,
            permits,
            shutdown: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_encoder_version(mut self, version: Option<String>) -> Self {
        self.encoder_version = version;
        self
    }

    /// Wait for a free conversion slot.
    ///
    /// Returns `None` once [`AppState::shutdown`] has closed the permits.
    pub async fn acquire_permit(&self) -> Option<OwnedSemaphorePermit> {
        self.permits.clone().acquire_owned().await.ok()
    }

    /// Token for a single request; cancelled when the server shuts down
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Cancel in-flight conversions and refuse new ones
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.permits.close();
    }

    /// Count a conversion as started; it stays in flight until the guard settles.
    pub fn record_started(&self) -> InFlightGuard<'_> {
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            stats: &self.stats,
            settled: false,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let started = self.stats.started.load(Ordering::Relaxed);
        let succeeded = self.stats.succeeded.load(Ordering::Relaxed);
        let failed = self.stats.failed.load(Ordering::Relaxed);
        StatsSnapshot {
            started,
            succeeded,
            failed,
            in_flight: started.saturating_sub(succeeded + failed),
            available_permits: self.permits.available_permits(),
            started_at: self.started_at,
            encoder_version: self.encoder_version.clone(),
        }
    }
}
