//! Background hygiene daemon: periodically sweeps the session registry
//! for connections whose outbound channel closed without ever
//! triggering the immediate on-send-failure eviction path.

use std::time::Duration;

use tokio::time::interval;
use tracing::info;

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn_reaper(state: AppState) {
    let mut ticker = interval(SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!("session reaper started");
        loop {
            ticker.tick().await;
            let purged = state.registry.purge_dead();
            if purged > 0 {
                info!(purged, "reaper evicted dead sessions");
            }
        }
    });
}
