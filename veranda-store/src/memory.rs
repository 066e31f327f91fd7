//! In-memory repository implementations backed by `RwLock<HashMap>`
//! tables. Every mutation happens in one write-lock section, so each
//! row change is atomic and concurrent reads never observe a torn row.
//! Tests and single-node deployments use these; a persistent store
//! implements the same traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use veranda_booking::{
    Booking, BookingModification, BookingRepository, BookingStatus, ModificationRepository,
    ModificationStatus,
};
use veranda_calendar::{
    BlockRepository, CalendarBlock, CalendarSource, RuleRepository, SeasonalRule, SourceRepository,
    SourceStatus,
};
use veranda_shared::StayRange;

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Default)]
pub struct InMemoryBookingRepository {
    rows: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), DynError> {
        self.rows.write().await.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, DynError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update(&self, booking: &Booking) -> Result<(), DynError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking.clone();
                Ok(())
            }
            None => Err(format!("booking {} not found", booking.id).into()),
        }
    }

    async fn update_if_status(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<bool, DynError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&booking.id) {
            Some(slot) if slot.status == expected => {
                *slot = booking.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(format!("booking {} not found", booking.id).into()),
        }
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryModificationRepository {
    rows: RwLock<HashMap<Uuid, BookingModification>>,
}

impl InMemoryModificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModificationRepository for InMemoryModificationRepository {
    async fn insert(&self, modification: &BookingModification) -> Result<(), DynError> {
        self.rows.write().await.insert(modification.id, modification.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<BookingModification>, DynError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update(&self, modification: &BookingModification) -> Result<(), DynError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&modification.id) {
            Some(slot) => {
                *slot = modification.clone();
                Ok(())
            }
            None => Err(format!("modification {} not found", modification.id).into()),
        }
    }

    async fn list_pending(&self) -> Result<Vec<BookingModification>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|m| m.status == ModificationStatus::Pending)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySourceRepository {
    rows: RwLock<HashMap<Uuid, CalendarSource>>,
}

impl InMemorySourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceRepository for InMemorySourceRepository {
    async fn insert(&self, source: &CalendarSource) -> Result<(), DynError> {
        self.rows.write().await.insert(source.id, source.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CalendarSource>, DynError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update(&self, source: &CalendarSource) -> Result<(), DynError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&source.id) {
            Some(slot) => {
                *slot = source.clone();
                Ok(())
            }
            None => Err(format!("source {} not found", source.id).into()),
        }
    }

    async fn list_schedulable(&self) -> Result<Vec<CalendarSource>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.status != SourceStatus::Disabled)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlockRepository {
    rows: RwLock<HashMap<Uuid, CalendarBlock>>,
}

impl InMemoryBlockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row, cancelled included. Test assertions use this.
    pub async fn all(&self) -> Vec<CalendarBlock> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl BlockRepository for InMemoryBlockRepository {
    async fn insert(&self, block: &CalendarBlock) -> Result<(), DynError> {
        self.rows.write().await.insert(block.id, block.clone());
        Ok(())
    }

    async fn update(&self, block: &CalendarBlock) -> Result<(), DynError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&block.id) {
            Some(slot) => {
                *slot = block.clone();
                Ok(())
            }
            None => Err(format!("block {} not found", block.id).into()),
        }
    }

    async fn active_for_property(
        &self,
        property_id: Uuid,
        range: &StayRange,
    ) -> Result<Vec<CalendarBlock>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|b| b.property_id == property_id && b.is_active() && b.range.overlaps(range))
            .cloned()
            .collect())
    }

    async fn for_source(&self, source_id: Uuid) -> Result<Vec<CalendarBlock>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|b| b.source_id == Some(source_id))
            .cloned()
            .collect())
    }

    async fn find_by_ref(
        &self,
        property_id: Uuid,
        external_ref: &str,
    ) -> Result<Option<CalendarBlock>, DynError> {
        let rows = self.rows.read().await;
        let mut matches: Vec<&CalendarBlock> = rows
            .values()
            .filter(|b| b.property_id == property_id && b.external_ref.as_deref() == Some(external_ref))
            .collect();
        // Prefer the active row when a cancelled twin is still around
        matches.sort_by_key(|b| (b.is_active(), b.updated_at));
        Ok(matches.last().map(|b| (*b).clone()))
    }
}

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rows: RwLock<HashMap<Uuid, SeasonalRule>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn insert(&self, rule: &SeasonalRule) -> Result<(), DynError> {
        self.rows.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn for_property(
        &self,
        property_id: Uuid,
        range: &StayRange,
    ) -> Result<Vec<SeasonalRule>, DynError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.property_id == property_id && r.range.overlaps(range))
            .cloned()
            .collect())
    }
}
