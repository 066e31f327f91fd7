//! Time-driven sweeps over booking state. All of them are idempotent
//! and safe to re-run: each acts through compare-and-set writes, so an
//! overlapping run or a racing user action simply wins or loses the
//! swap.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use veranda_core::WorkflowResult;

use crate::manager::BookingService;
use crate::models::{BookingStatus, ModificationStatus};

pub const HOST_RESPONSE_EXPIRED_REASON: &str = "Host response deadline expired";

impl BookingService {
    /// Auto-decline PENDING bookings whose host never answered.
    pub async fn expire_host_responses(&self, now: DateTime<Utc>) -> WorkflowResult<usize> {
        let pending = self.bookings.list_by_status(BookingStatus::Pending).await?;
        let mut declined = 0;

        for booking in pending {
            let Some(deadline) = booking.host_response_deadline else {
                continue;
            };
            if deadline > now {
                continue;
            }

            let mut update = booking;
            update.status_reason = Some(HOST_RESPONSE_EXPIRED_REASON.to_string());
            update.apply_status(BookingStatus::Declined, now);

            match self.bookings.update_if_status(&update, BookingStatus::Pending).await {
                Ok(true) => {
                    declined += 1;
                    self.release_occupancy(&update).await;
                    self.notify(update.id, "booking_declined", HOST_RESPONSE_EXPIRED_REASON)
                        .await;
                    self.notify_status_change(&update, BookingStatus::Pending).await;
                }
                // The host answered while we were sweeping; theirs wins
                Ok(false) => {}
                Err(err) => warn!(booking = %update.booking_number, "Auto-decline failed: {err}"),
            }
        }

        if declined > 0 {
            info!("Auto-declined {declined} expired booking requests");
        }
        Ok(declined)
    }

    /// Auto-complete stays one day past check-out.
    pub async fn complete_checkouts(&self, now: DateTime<Utc>) -> WorkflowResult<usize> {
        let checked_out = self.bookings.list_by_status(BookingStatus::CheckedOut).await?;
        let mut completed = 0;

        for booking in checked_out {
            if now.date_naive() <= booking.stay.check_out {
                continue;
            }

            let mut update = booking;
            update.apply_status(BookingStatus::Completed, now);
            match self.bookings.update_if_status(&update, BookingStatus::CheckedOut).await {
                Ok(true) => {
                    completed += 1;
                    self.notify_status_change(&update, BookingStatus::CheckedOut).await;
                }
                Ok(false) => {}
                Err(err) => warn!(booking = %update.booking_number, "Auto-complete failed: {err}"),
            }
        }

        if completed > 0 {
            info!("Auto-completed {completed} checked-out bookings");
        }
        Ok(completed)
    }

    /// Remind guests whose stay starts `reminder_lead_days` from now.
    /// The sent marker makes re-runs a no-op.
    pub async fn send_checkin_reminders(&self, now: DateTime<Utc>) -> WorkflowResult<usize> {
        let confirmed = self.bookings.list_by_status(BookingStatus::Confirmed).await?;
        let mut sent = 0;

        for booking in confirmed {
            if booking.reminder_sent_at.is_some() {
                continue;
            }
            let days_out = (booking.stay.check_in - now.date_naive()).num_days();
            if days_out != self.rules.reminder_lead_days {
                continue;
            }

            let mut update = booking;
            update.reminder_sent_at = Some(now);
            update.updated_at = now;
            match self.bookings.update_if_status(&update, BookingStatus::Confirmed).await {
                Ok(true) => {
                    sent += 1;
                    self.notify(
                        update.id,
                        "checkin_reminder",
                        &format!("Check-in for {} is on {}", update.booking_number, update.stay.check_in),
                    )
                    .await;
                }
                Ok(false) => {}
                Err(err) => warn!(booking = %update.booking_number, "Reminder update failed: {err}"),
            }
        }

        Ok(sent)
    }

    /// Expire pending modifications past their approval deadline.
    pub async fn expire_modifications(&self, now: DateTime<Utc>) -> WorkflowResult<usize> {
        let pending = self.modifications.list_pending().await?;
        let mut expired = 0;

        for modification in pending {
            if modification.expires_at > now {
                continue;
            }
            let mut update = modification;
            update.resolve(ModificationStatus::Expired, now);
            match self.modifications.update(&update).await {
                Ok(()) => expired += 1,
                Err(err) => warn!(modification = %update.id, "Expiry update failed: {err}"),
            }
        }

        if expired > 0 {
            info!("Expired {expired} stale modification requests");
        }
        Ok(expired)
    }

    /// Drop expired availability leases so abandoned checkouts never
    /// pin a property.
    pub async fn purge_expired_locks(&self) -> usize {
        self.locks.purge_expired().await
    }
}
