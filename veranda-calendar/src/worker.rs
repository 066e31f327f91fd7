use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use crate::sync::SyncEngine;

/// Timer-driven sync loop. Runs until the task is aborted; every pass
/// is isolated so a failing source never stops the worker.
pub async fn run_sync_worker(engine: Arc<SyncEngine>, tick: Duration) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Calendar sync worker started, tick every {tick:?}");

    loop {
        ticker.tick().await;
        let outcomes = engine.sync_all_due().await;
        if outcomes.is_empty() {
            continue;
        }

        let failures = outcomes.iter().filter(|o| !o.is_success()).count();
        if failures > 0 {
            error!(
                "Sync pass finished: {} sources, {failures} failed",
                outcomes.len()
            );
        } else {
            info!("Sync pass finished: {} sources", outcomes.len());
        }
    }
}
