//! Booking lifecycle orchestration: creation, status transitions, and
//! cancellation. Every multi-step mutation releases its availability
//! lock and rolls back partial writes on any failure path.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;
use veranda_calendar::{BlockRepository, CalendarBlock, CalendarProjection, Reconciler};
use veranda_core::{
    Notifier, PaymentGateway, PropertyDirectory, PropertyInfo, WorkflowError, WorkflowResult,
};
use veranda_shared::events::BookingStatusChangedEvent;
use veranda_shared::GuestCount;

use crate::locks::AvailabilityLockManager;
use crate::models::{
    Actor, ActorRole, Booking, BookingRules, BookingStatus, CancellationRequest,
    CreateBookingRequest, PricingSnapshot,
};
use crate::refund::{calculate_refund, RefundBreakdown};
use crate::repository::{BookingRepository, ModificationRepository};

/// The surface the API layer calls. Collaborators (payments,
/// notifications, property data) sit behind traits; calendar state is
/// reached through the reconciler and block repository.
pub struct BookingService {
    pub(crate) bookings: Arc<dyn BookingRepository>,
    pub(crate) modifications: Arc<dyn ModificationRepository>,
    pub(crate) blocks: Arc<dyn BlockRepository>,
    pub(crate) reconciler: Arc<Reconciler>,
    pub(crate) locks: Arc<AvailabilityLockManager>,
    pub(crate) directory: Arc<dyn PropertyDirectory>,
    pub(crate) payments: Arc<dyn PaymentGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) rules: BookingRules,
}

impl BookingService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        modifications: Arc<dyn ModificationRepository>,
        blocks: Arc<dyn BlockRepository>,
        reconciler: Arc<Reconciler>,
        locks: Arc<AvailabilityLockManager>,
        directory: Arc<dyn PropertyDirectory>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        rules: BookingRules,
    ) -> Self {
        Self {
            bookings,
            modifications,
            blocks,
            reconciler,
            locks,
            directory,
            payments,
            notifier,
            rules,
        }
    }

    pub async fn get(&self, booking_id: Uuid) -> WorkflowResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {booking_id}")))
    }

    /// Create a booking: validate, hold the range, price it, persist.
    /// Instant-book properties start CONFIRMED and occupy their dates
    /// immediately; everyone else waits for the host.
    pub async fn create(
        &self,
        request: CreateBookingRequest,
        guest_id: Uuid,
    ) -> WorkflowResult<Booking> {
        let property = self
            .directory
            .get_property(request.property_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::ValidationFailed(format!("unknown property {}", request.property_id))
            })?;

        self.validate_create(&request, &property)?;

        let projection = self
            .reconciler
            .project(request.property_id, request.stay, None)
            .await?;
        if !projection.all_available() {
            return Err(WorkflowError::DatesUnavailable(request.stay.to_string()));
        }
        let min_stay = projection.min_stay_at_start() as i64;
        if request.stay.nights() < min_stay {
            return Err(WorkflowError::ValidationFailed(format!(
                "minimum stay is {min_stay} nights for these dates"
            )));
        }

        let holder = guest_id.to_string();
        let grant = self
            .locks
            .acquire(request.property_id, request.stay, &holder)
            .await?;
        if !grant.can_proceed {
            self.locks.release(grant.token, &holder).await;
            return Err(WorkflowError::DatesUnavailable(request.stay.to_string()));
        }

        let result = self
            .create_locked(&request, guest_id, &property, &projection)
            .await;
        // Held or not, the lease goes away on every exit path
        self.locks.release(grant.token, &holder).await;
        result
    }

    async fn create_locked(
        &self,
        request: &CreateBookingRequest,
        guest_id: Uuid,
        property: &PropertyInfo,
        projection: &CalendarProjection,
    ) -> WorkflowResult<Booking> {
        let pricing = self.price_stay(property, projection, &request.guests);
        let initial = if property.instant_book {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };
        let booking = Booking::new(
            property,
            guest_id,
            request.stay,
            request.guests,
            pricing,
            initial,
            &self.rules,
        );

        if property.instant_book {
            // Charge before persisting so a declined card leaves
            // nothing behind
            self.payments
                .process_payment(booking.id, booking.pricing.total, &booking.pricing.currency)
                .await
                .map_err(|e| WorkflowError::External(format!("payment failed: {e}")))?;
        }

        self.bookings.insert(&booking).await?;

        if property.instant_book {
            if let Err(err) = self.write_internal_block(&booking).await {
                // Roll back the inserted row rather than leave a
                // confirmed stay that does not occupy the calendar
                let mut rollback = booking.clone();
                rollback.status_reason = Some("calendar write failed".to_string());
                rollback.apply_status(BookingStatus::Cancelled, Utc::now());
                if let Err(rollback_err) = self
                    .bookings
                    .update_if_status(&rollback, BookingStatus::Confirmed)
                    .await
                {
                    error!(booking = %booking.booking_number, "Rollback failed: {rollback_err}");
                }
                return Err(err);
            }
        }

        info!(
            booking = %booking.booking_number,
            property = %booking.property_id,
            status = %booking.status,
            "Booking created"
        );
        let event_type = if property.instant_book {
            "booking_confirmed"
        } else {
            "booking_requested"
        };
        self.notify(booking.id, event_type, &format!("Booking {} created", booking.booking_number))
            .await;

        Ok(booking)
    }

    /// Move a booking along one allowed edge. Writes are
    /// compare-and-set on the current status so racing transitions
    /// cannot be lost.
    pub async fn transition(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
        actor: Actor,
    ) -> WorkflowResult<Booking> {
        let mut booking = self.get(booking_id).await?;
        let current = booking.status;

        if !current.can_transition_to(new_status) {
            return Err(WorkflowError::InvalidStatusTransition {
                from: current.to_string(),
                to: new_status.to_string(),
            });
        }

        // Responding to a booking request is the host's call
        if current == BookingStatus::Pending
            && matches!(new_status, BookingStatus::Confirmed | BookingStatus::Declined)
            && !Self::acts_for_host(&booking, actor)
        {
            return Err(WorkflowError::ValidationFailed(
                "only the host can respond to a booking request".to_string(),
            ));
        }

        if new_status == BookingStatus::Confirmed {
            return self.confirm(booking).await;
        }

        booking.apply_status(new_status, Utc::now());
        if !self.bookings.update_if_status(&booking, current).await? {
            return Err(WorkflowError::InvalidStatusTransition {
                from: format!("{current} (changed concurrently)"),
                to: new_status.to_string(),
            });
        }

        match new_status {
            BookingStatus::CheckedOut => {
                // Deposit release is external; its failure must not
                // undo the checkout
                self.try_release_deposit(booking.id).await;
            }
            BookingStatus::Declined | BookingStatus::Cancelled => {
                self.release_occupancy(&booking).await;
            }
            _ => {}
        }

        self.notify_status_change(&booking, current).await;
        Ok(booking)
    }

    /// PENDING -> CONFIRMED with availability re-check, payment, block
    /// write, and compare-and-set, rolled back in reverse on failure.
    async fn confirm(&self, mut booking: Booking) -> WorkflowResult<Booking> {
        let current = booking.status;

        // The lock taken at creation may have expired long ago, so
        // re-validate against everything but our own occupancy
        let free = self
            .reconciler
            .is_range_free(booking.property_id, booking.stay, Some(&booking.occupancy_ref()))
            .await?;
        if !free {
            return Err(WorkflowError::DatesUnavailable(booking.stay.to_string()));
        }

        self.payments
            .process_payment(booking.id, booking.pricing.total, &booking.pricing.currency)
            .await
            .map_err(|e| WorkflowError::External(format!("payment failed: {e}")))?;

        self.write_internal_block(&booking).await?;

        booking.apply_status(BookingStatus::Confirmed, Utc::now());
        if !self.bookings.update_if_status(&booking, current).await? {
            // A racing transition won; undo the block we just wrote
            self.release_occupancy(&booking).await;
            return Err(WorkflowError::InvalidStatusTransition {
                from: format!("{current} (changed concurrently)"),
                to: BookingStatus::Confirmed.to_string(),
            });
        }

        self.notify_status_change(&booking, current).await;
        Ok(booking)
    }

    /// Guest-facing cancellation with refund math. Blocked once the
    /// cancellation deadline has passed; operational cancellations go
    /// through `transition` instead.
    pub async fn cancel(
        &self,
        booking_id: Uuid,
        request: CancellationRequest,
        actor: Actor,
    ) -> WorkflowResult<(Booking, RefundBreakdown)> {
        let mut booking = self.get(booking_id).await?;
        let current = booking.status;

        if current.is_terminal() {
            return Err(WorkflowError::CancellationNotAllowed(format!(
                "booking is already {current}"
            )));
        }
        if !current.can_transition_to(BookingStatus::Cancelled) {
            return Err(WorkflowError::InvalidStatusTransition {
                from: current.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        let now = Utc::now();
        if let Some(deadline) = booking.cancellation_deadline {
            if now > deadline {
                return Err(WorkflowError::CancellationNotAllowed(
                    "the cancellation deadline has passed".to_string(),
                ));
            }
        }

        let refund = calculate_refund(&booking.pricing, &booking.policy, booking.stay.check_in, now);

        booking.status_reason = Some(request.reason.unwrap_or_else(|| match actor.role {
            ActorRole::Guest => "Cancelled by guest".to_string(),
            ActorRole::Host => "Cancelled by host".to_string(),
            ActorRole::System => "Cancelled by system".to_string(),
        }));
        booking.apply_status(BookingStatus::Cancelled, now);
        if !self.bookings.update_if_status(&booking, current).await? {
            return Err(WorkflowError::InvalidStatusTransition {
                from: format!("{current} (changed concurrently)"),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        self.release_occupancy(&booking).await;
        self.try_release_deposit(booking.id).await;
        if refund.total_refund > 0 {
            self.try_issue_refund(booking.id, refund.total_refund).await;
        }

        info!(
            booking = %booking.booking_number,
            refund = refund.total_refund,
            "Booking cancelled"
        );
        self.notify_status_change(&booking, current).await;

        Ok((booking, refund))
    }

    fn validate_create(
        &self,
        request: &CreateBookingRequest,
        property: &PropertyInfo,
    ) -> WorkflowResult<()> {
        if !request.stay.is_valid() {
            return Err(WorkflowError::ValidationFailed(
                "check-out must be after check-in".to_string(),
            ));
        }
        if request.stay.check_in < Utc::now().date_naive() {
            return Err(WorkflowError::ValidationFailed(
                "check-in date is in the past".to_string(),
            ));
        }
        if request.stay.nights() > self.rules.max_stay_nights {
            return Err(WorkflowError::ValidationFailed(format!(
                "stays are limited to {} nights",
                self.rules.max_stay_nights
            )));
        }
        if request.guests.adults == 0 {
            return Err(WorkflowError::ValidationFailed(
                "at least one adult is required".to_string(),
            ));
        }
        if request.guests.counted() > property.max_guests {
            return Err(WorkflowError::ValidationFailed(format!(
                "property sleeps at most {} guests",
                property.max_guests
            )));
        }
        if request.guests.pets > 0 && !property.pets_allowed {
            return Err(WorkflowError::ValidationFailed(
                "pets are not allowed at this property".to_string(),
            ));
        }
        Ok(())
    }

    /// Nightly prices come from the projection (seasonal rules
    /// applied); fees and percentages from the property record.
    pub(crate) fn price_stay(
        &self,
        property: &PropertyInfo,
        projection: &CalendarProjection,
        guests: &GuestCount,
    ) -> PricingSnapshot {
        let nights = projection.days.len() as i64;
        let nightly_subtotal = projection.nightly_subtotal();

        let extra_guests = guests.counted().saturating_sub(property.included_guests) as i64;
        let extra_guest_fee = extra_guests * property.extra_guest_fee * nights;
        let pet_fee = if guests.pets > 0 { property.pet_fee } else { 0 };
        let cleaning_fee = property.cleaning_fee;

        let fee_base = nightly_subtotal + cleaning_fee + extra_guest_fee + pet_fee;
        let service_fee = percentage_of(fee_base, property.service_fee_percent);
        let taxes = percentage_of(fee_base + service_fee, property.tax_percent);

        PricingSnapshot {
            nightly_subtotal,
            cleaning_fee,
            extra_guest_fee,
            pet_fee,
            service_fee,
            taxes,
            modification_fees: 0,
            total: fee_base + service_fee + taxes,
            nights,
            currency: property.currency.clone(),
        }
    }

    fn acts_for_host(booking: &Booking, actor: Actor) -> bool {
        match actor.role {
            ActorRole::Host => actor.id == booking.host_id,
            ActorRole::System => true,
            ActorRole::Guest => false,
        }
    }

    /// Write the internal occupancy block for a confirmed stay.
    pub(crate) async fn write_internal_block(&self, booking: &Booking) -> WorkflowResult<()> {
        let block = CalendarBlock::for_booking(
            booking.property_id,
            booking.id,
            booking.stay,
            Some(booking.booking_number.clone()),
        );
        self.blocks.insert(&block).await?;
        Ok(())
    }

    /// Soft-cancel the internal block, if one exists. Failures are
    /// logged: the booking state has already moved and a stale block
    /// is recoverable, a half-reverted booking is not.
    pub(crate) async fn release_occupancy(&self, booking: &Booking) {
        let found = self
            .blocks
            .find_by_ref(booking.property_id, &booking.occupancy_ref())
            .await;
        match found {
            Ok(Some(mut block)) if block.is_active() => {
                block.cancel();
                if let Err(err) = self.blocks.update(&block).await {
                    error!(booking = %booking.booking_number, "Could not cancel occupancy block: {err}");
                }
            }
            Ok(_) => {}
            Err(err) => {
                error!(booking = %booking.booking_number, "Occupancy block lookup failed: {err}");
            }
        }
    }

    async fn try_release_deposit(&self, booking_id: Uuid) {
        for attempt in 1..=2u8 {
            match self.payments.release_security_deposit(booking_id).await {
                Ok(_) => return,
                Err(err) if attempt < 2 => {
                    warn!(%booking_id, "Deposit release failed (attempt {attempt}): {err}")
                }
                Err(err) => error!(%booking_id, "Deposit release failed: {err}"),
            }
        }
    }

    async fn try_issue_refund(&self, booking_id: Uuid, amount: i64) {
        for attempt in 1..=2u8 {
            match self.payments.issue_refund(booking_id, amount).await {
                Ok(_) => return,
                Err(err) if attempt < 2 => {
                    warn!(%booking_id, "Refund failed (attempt {attempt}): {err}")
                }
                Err(err) => error!(%booking_id, "Refund failed, needs manual follow-up: {err}"),
            }
        }
    }

    pub(crate) async fn notify_status_change(&self, booking: &Booking, previous: BookingStatus) {
        let event = BookingStatusChangedEvent {
            booking_id: booking.id,
            property_id: booking.property_id,
            from: previous.to_string(),
            to: booking.status.to_string(),
            occurred_at: booking.updated_at,
        };
        let message = serde_json::to_string(&event).unwrap_or_default();
        self.notify(booking.id, "booking_status_changed", &message).await;
    }

    /// Fire-and-forget: a notification failure never fails the
    /// operation that raised it.
    pub(crate) async fn notify(&self, booking_id: Uuid, event_type: &str, message: &str) {
        if let Err(err) = self.notifier.notify(booking_id, event_type, message).await {
            warn!(%booking_id, event_type, "Notification failed: {err}");
        }
    }
}

fn percentage_of(amount: i64, percent: f64) -> i64 {
    ((amount as f64) * percent / 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_of_rounds() {
        assert_eq!(percentage_of(10_000, 12.0), 1_200);
        assert_eq!(percentage_of(333, 10.0), 33);
        assert_eq!(percentage_of(335, 10.0), 34);
        assert_eq!(percentage_of(0, 12.0), 0);
    }
}
