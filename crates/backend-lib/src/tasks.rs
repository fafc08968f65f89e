// ============================
// crates/backend-lib/src/tasks.rs
// ============================
//! Periodic maintenance tasks.
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::auth::SessionManager;
use crate::metrics::SESSION_SWEPT;
use crate::storage::SessionStore;

/// Delete expired sessions from `store` every `every`.
pub fn spawn_session_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.delete_expired().await {
                Ok(0) => debug!("session sweep found nothing to remove"),
                Ok(removed) => {
                    counter!(SESSION_SWEPT).increment(removed);
                    info!(removed, "removed expired sessions");
                }
                Err(err) => warn!(error = %err, "session sweep failed"),
            }
        }
    })
}

/// Drop lockout entries that are neither locked nor recent every `every`.
pub fn spawn_lockout_sweeper(manager: Arc<SessionManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let purged = manager.lockout().purge_stale();
            if purged > 0 {
                debug!(purged, "purged stale lockout entries");
            }
        }
    })
}
