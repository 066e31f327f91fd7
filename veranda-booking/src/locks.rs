//! Short-lived exclusive holds on a (property, date-range) pair.
//!
//! Closes the race between "observed free" and "persisted booking":
//! concurrent checkouts for overlapping ranges serialize here, and a
//! crashed holder's lease simply expires, so a property can never be
//! permanently blocked.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;
use veranda_calendar::Reconciler;
use veranda_core::{WorkflowError, WorkflowResult};
use veranda_shared::events::RangeHeldEvent;
use veranda_shared::StayRange;

#[derive(Debug, Clone)]
pub struct AvailabilityLock {
    pub token: Uuid,
    pub property_id: Uuid,
    pub range: StayRange,
    pub holder: String,
    pub expires_at: DateTime<Utc>,
}

/// What `acquire` hands back. `can_proceed` is false when the lease was
/// granted but the reconciler already shows the range occupied; the
/// caller must release and fail with `dates_unavailable`.
#[derive(Debug, Clone, Copy)]
pub struct LockGrant {
    pub token: Uuid,
    pub can_proceed: bool,
    pub expires_at: DateTime<Utc>,
}

/// Explicit lock table keyed by property id with hard expiry.
pub struct AvailabilityLockManager {
    table: Mutex<HashMap<Uuid, Vec<AvailabilityLock>>>,
    reconciler: Arc<Reconciler>,
    ttl: Duration,
}

impl AvailabilityLockManager {
    pub fn new(reconciler: Arc<Reconciler>, ttl: Duration) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            reconciler,
            ttl,
        }
    }

    /// Grant an exclusive hold on the range. Fails with
    /// `availability_lock_failed` when an unexpired lock on an
    /// overlapping range belongs to a different holder; re-entrant for
    /// the same holder.
    pub async fn acquire(
        &self,
        property_id: Uuid,
        range: StayRange,
        holder: &str,
    ) -> WorkflowResult<LockGrant> {
        if !range.is_valid() {
            return Err(WorkflowError::ValidationFailed(format!(
                "lock range end must be after start: {range}"
            )));
        }

        let mut table = self.table.lock().await;
        let now = Utc::now();
        let locks = table.entry(property_id).or_default();
        locks.retain(|l| l.expires_at > now);

        if locks.iter().any(|l| l.holder != holder && l.range.overlaps(&range)) {
            return Err(WorkflowError::AvailabilityLockFailed(format!(
                "range {range} is held by another request"
            )));
        }

        // Table mutex stays held across the read, so two racing
        // acquires cannot both observe the range free.
        let free = self.reconciler.is_range_free(property_id, range, None).await?;

        let lock = AvailabilityLock {
            token: Uuid::new_v4(),
            property_id,
            range,
            holder: holder.to_string(),
            expires_at: now + self.ttl,
        };
        let grant = LockGrant {
            token: lock.token,
            can_proceed: free,
            expires_at: lock.expires_at,
        };

        let event = RangeHeldEvent {
            property_id,
            check_in: range.check_in,
            check_out: range.check_out,
            holder: holder.to_string(),
            expires_at: lock.expires_at,
        };
        debug!(payload = %serde_json::to_string(&event).unwrap_or_default(), "Range held");

        locks.push(lock);
        Ok(grant)
    }

    /// Idempotent release; safe to call on every exit path, including
    /// after the lease has already expired.
    pub async fn release(&self, token: Uuid, holder: &str) {
        let mut table = self.table.lock().await;
        for locks in table.values_mut() {
            locks.retain(|l| !(l.token == token && l.holder == holder));
        }
        table.retain(|_, locks| !locks.is_empty());
    }

    /// Drop every expired lease; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut table = self.table.lock().await;
        let now = Utc::now();
        let before: usize = table.values().map(Vec::len).sum();
        for locks in table.values_mut() {
            locks.retain(|l| l.expires_at > now);
        }
        table.retain(|_, locks| !locks.is_empty());
        let after: usize = table.values().map(Vec::len).sum();
        before - after
    }
}
