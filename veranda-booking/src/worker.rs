use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use crate::manager::BookingService;

/// Timer-driven lifecycle loop: deadline sweeps, reminders, and lock
/// purging. Each sweep is isolated; one failing never stops the rest.
pub async fn run_lifecycle_worker(service: Arc<BookingService>, tick: Duration) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Booking lifecycle worker started, tick every {tick:?}");

    loop {
        ticker.tick().await;
        let now = Utc::now();

        if let Err(err) = service.expire_host_responses(now).await {
            error!("Host-response sweep failed: {err}");
        }
        if let Err(err) = service.complete_checkouts(now).await {
            error!("Checkout-completion sweep failed: {err}");
        }
        if let Err(err) = service.send_checkin_reminders(now).await {
            error!("Check-in reminder sweep failed: {err}");
        }
        if let Err(err) = service.expire_modifications(now).await {
            error!("Modification-expiry sweep failed: {err}");
        }
        service.purge_expired_locks().await;
    }
}
