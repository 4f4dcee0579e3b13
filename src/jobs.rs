//! Scheduled jobs.
//!
//! Real-time listing matching is reserved for a future job; the sweep below
//! is the deliberate no-op placeholder that keeps the schedule in place.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::store::Database;

/// Spawn the periodic listing-match sweep.
///
/// Currently it only counts saved searches and logs; matching itself is
/// not implemented yet.
pub fn spawn_match_sweep(
    db: Arc<dyn Database>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the sweep starts
        // one full interval after boot.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match db.count_saved_searches().await {
                Ok(count) => {
                    debug!(saved_searches = count, "Listing match sweep (matching not implemented)")
                }
                Err(e) => warn!(error = %e, "Match sweep could not read saved searches"),
            }
        }
    })
}
