//! Background expiry of old reports.
//!
//! Runs on its own timer, independent of request handling. A failed tick is
//! logged and the next tick simply tries again; expired reports are already
//! hidden from listings, so a missed sweep only delays the physical purge.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::services::REPORT_TTL;
use crate::{clock::Clock, store::ReportStore};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Deletes every report older than the visibility TTL. Ratings are not
/// touched: natural expiry is not a penalty.
pub async fn sweep_expired(store: &dyn ReportStore, clock: &dyn Clock) -> sqlx::Result<u64> {
    let cutoff = clock.now() - REPORT_TTL;
    store.delete_expired(cutoff).await
}

pub fn spawn(store: Arc<dyn ReportStore>, clock: Arc<dyn Clock>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = SWEEP_INTERVAL.as_secs(), "report sweeper started");

        loop {
            ticker.tick().await;
            match sweep_expired(store.as_ref(), clock.as_ref()).await {
                Ok(0) => debug!("sweep found nothing to purge"),
                Ok(purged) => info!(purged, "expired reports purged"),
                Err(e) => error!(error = %e, "report sweep failed"),
            }
        }
    })
}
