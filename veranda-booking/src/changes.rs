//! Booking modification requests: a guest proposes new dates or a new
//! party, the host approves or rejects within a deadline.

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;
use veranda_core::{WorkflowError, WorkflowResult};

use crate::manager::BookingService;
use crate::models::{
    Actor, ActorRole, Booking, BookingModification, BookingStatus, ModificationChange,
    ModificationRequest, ModificationStatus, RequestedChange,
};

impl BookingService {
    /// Propose a change to an upcoming stay. Refused when the booking
    /// is terminal, the guest has already checked in, or check-in is
    /// closer than the modification cutoff.
    pub async fn request_modification(
        &self,
        booking_id: Uuid,
        request: ModificationRequest,
        actor: Actor,
    ) -> WorkflowResult<BookingModification> {
        let booking = self.get(booking_id).await?;
        self.ensure_modifiable(&booking)?;

        if actor.role == ActorRole::Guest && actor.id != booking.guest_id {
            return Err(WorkflowError::ModificationNotAllowed(
                "only the booking's guest can request changes".to_string(),
            ));
        }

        let property = self
            .directory
            .get_property(booking.property_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("property {}", booking.property_id)))?;

        let (change, price_delta) = match request.change {
            RequestedChange::Dates(to) => {
                if !to.is_valid() {
                    return Err(WorkflowError::ValidationFailed(
                        "check-out must be after check-in".to_string(),
                    ));
                }
                if to.nights() > self.rules.max_stay_nights {
                    return Err(WorkflowError::ValidationFailed(format!(
                        "stays are limited to {} nights",
                        self.rules.max_stay_nights
                    )));
                }

                // Re-validate the new range, ignoring this booking's
                // own occupancy
                let projection = self
                    .reconciler
                    .project(booking.property_id, to, Some(&booking.occupancy_ref()))
                    .await?;
                if !projection.all_available() {
                    return Err(WorkflowError::DatesUnavailable(to.to_string()));
                }
                let min_stay = projection.min_stay_at_start() as i64;
                if to.nights() < min_stay {
                    return Err(WorkflowError::ValidationFailed(format!(
                        "minimum stay is {min_stay} nights for these dates"
                    )));
                }

                let new_pricing = self.price_stay(&property, &projection, &booking.guests);
                let delta = new_pricing.total - booking.pricing.total;
                (ModificationChange::Dates { from: booking.stay, to }, delta)
            }
            RequestedChange::Guests(to) => {
                if to.adults == 0 {
                    return Err(WorkflowError::ValidationFailed(
                        "at least one adult is required".to_string(),
                    ));
                }
                if to.counted() > property.max_guests {
                    return Err(WorkflowError::ValidationFailed(format!(
                        "property sleeps at most {} guests",
                        property.max_guests
                    )));
                }
                if to.pets > 0 && !property.pets_allowed {
                    return Err(WorkflowError::ValidationFailed(
                        "pets are not allowed at this property".to_string(),
                    ));
                }

                let projection = self
                    .reconciler
                    .project(booking.property_id, booking.stay, Some(&booking.occupancy_ref()))
                    .await?;
                let new_pricing = self.price_stay(&property, &projection, &to);
                let delta = new_pricing.total - booking.pricing.total;
                (ModificationChange::Guests { from: booking.guests, to }, delta)
            }
        };

        let modification = BookingModification::new(
            booking.id,
            change,
            price_delta,
            self.rules.modification_fee,
            actor.id,
            Duration::hours(self.rules.modification_window_hours),
        );
        self.modifications.insert(&modification).await?;

        info!(
            booking = %booking.booking_number,
            delta = price_delta,
            "Modification requested"
        );
        self.notify(
            booking.id,
            "modification_requested",
            &format!("Change requested for booking {}", booking.booking_number),
        )
        .await;

        Ok(modification)
    }

    /// Host decision on a pending modification. Approval re-validates
    /// and applies the change; either way the request is closed.
    pub async fn resolve_modification(
        &self,
        modification_id: Uuid,
        approve: bool,
        actor: Actor,
    ) -> WorkflowResult<BookingModification> {
        let mut modification = self
            .modifications
            .get(modification_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("modification {modification_id}")))?;

        if !modification.is_pending() {
            return Err(WorkflowError::ModificationNotAllowed(
                "modification has already been resolved".to_string(),
            ));
        }

        let mut booking = self.get(modification.booking_id).await?;
        match actor.role {
            ActorRole::Host if actor.id == booking.host_id => {}
            ActorRole::System => {}
            _ => {
                return Err(WorkflowError::ModificationNotAllowed(
                    "only the host can resolve a modification".to_string(),
                ));
            }
        }

        let now = Utc::now();
        if now > modification.expires_at {
            modification.resolve(ModificationStatus::Expired, now);
            self.modifications.update(&modification).await?;
            return Err(WorkflowError::ModificationNotAllowed(
                "the approval deadline has passed".to_string(),
            ));
        }

        if !approve {
            modification.resolve(ModificationStatus::Rejected, now);
            self.modifications.update(&modification).await?;
            self.notify(
                booking.id,
                "modification_rejected",
                &format!("Change rejected for booking {}", booking.booking_number),
            )
            .await;
            return Ok(modification);
        }

        self.ensure_modifiable(&booking)?;
        self.apply_modification(&mut booking, &modification).await?;

        modification.resolve(ModificationStatus::Approved, now);
        self.modifications.update(&modification).await?;

        info!(booking = %booking.booking_number, "Modification approved");
        self.notify(
            booking.id,
            "modification_approved",
            &format!("Change applied to booking {}", booking.booking_number),
        )
        .await;

        Ok(modification)
    }

    async fn apply_modification(
        &self,
        booking: &mut Booking,
        modification: &BookingModification,
    ) -> WorkflowResult<()> {
        let property = self
            .directory
            .get_property(booking.property_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("property {}", booking.property_id)))?;
        let current = booking.status;

        match &modification.change {
            ModificationChange::Dates { to, .. } => {
                let free = self
                    .reconciler
                    .is_range_free(booking.property_id, *to, Some(&booking.occupancy_ref()))
                    .await?;
                if !free {
                    return Err(WorkflowError::DatesUnavailable(to.to_string()));
                }
                booking.stay = *to;
                booking.cancellation_deadline = Some(Booking::cancellation_deadline_for(to));
            }
            ModificationChange::Guests { to, .. } => {
                booking.guests = *to;
            }
        }

        // Re-freeze pricing for the new stay, carrying the flat fees
        let projection = self
            .reconciler
            .project(booking.property_id, booking.stay, Some(&booking.occupancy_ref()))
            .await?;
        let mut pricing = self.price_stay(&property, &projection, &booking.guests);
        pricing.modification_fees = booking.pricing.modification_fees + modification.modification_fee;
        pricing.total += pricing.modification_fees;
        booking.pricing = pricing;

        // Charge or refund the difference before persisting anything
        let owed = modification.price_delta + modification.modification_fee;
        if owed > 0 {
            self.payments
                .process_payment(booking.id, owed, &booking.pricing.currency)
                .await
                .map_err(|e| WorkflowError::External(format!("payment failed: {e}")))?;
        } else if owed < 0 {
            self.payments
                .issue_refund(booking.id, -owed)
                .await
                .map_err(|e| WorkflowError::External(format!("refund failed: {e}")))?;
        }

        booking.updated_at = Utc::now();
        if !self.bookings.update_if_status(booking, current).await? {
            return Err(WorkflowError::ModificationNotAllowed(
                "booking changed while the modification was being applied".to_string(),
            ));
        }

        // Keep the internal occupancy block in step with the new dates
        if booking.status.occupies_calendar() {
            if let ModificationChange::Dates { to, .. } = &modification.change {
                match self
                    .blocks
                    .find_by_ref(booking.property_id, &booking.occupancy_ref())
                    .await
                {
                    Ok(Some(mut block)) => {
                        block.reschedule(*to, Some(booking.booking_number.clone()));
                        self.blocks.update(&block).await?;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        return Err(WorkflowError::External(format!(
                            "occupancy block lookup failed: {err}"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn ensure_modifiable(&self, booking: &Booking) -> WorkflowResult<()> {
        if booking.status.is_terminal()
            || matches!(booking.status, BookingStatus::CheckedIn | BookingStatus::CheckedOut)
        {
            return Err(WorkflowError::ModificationNotAllowed(format!(
                "booking is {}",
                booking.status
            )));
        }

        let cutoff = Booking::cancellation_deadline_for(&booking.stay)
            - Duration::hours(self.rules.modification_cutoff_hours);
        if Utc::now() > cutoff {
            return Err(WorkflowError::ModificationNotAllowed(format!(
                "changes close {} hours before check-in",
                self.rules.modification_cutoff_hours
            )));
        }
        Ok(())
    }
}
