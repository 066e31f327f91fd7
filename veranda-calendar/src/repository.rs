use async_trait::async_trait;
use uuid::Uuid;
use veranda_shared::StayRange;

use crate::models::{CalendarBlock, CalendarSource, SeasonalRule};

/// Repository trait for calendar source configuration
#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn insert(
        &self,
        source: &CalendarSource,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<CalendarSource>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update(
        &self,
        source: &CalendarSource,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Every source that has not been disabled.
    async fn list_schedulable(
        &self,
    ) -> Result<Vec<CalendarSource>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for calendar blocks. Each mutation is atomic per
/// row so reconciliation reads tolerate in-flight sync updates.
#[async_trait]
pub trait BlockRepository: Send + Sync {
    async fn insert(
        &self,
        block: &CalendarBlock,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn update(
        &self,
        block: &CalendarBlock,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Active blocks overlapping the range for one property.
    async fn active_for_property(
        &self,
        property_id: Uuid,
        range: &StayRange,
    ) -> Result<Vec<CalendarBlock>, Box<dyn std::error::Error + Send + Sync>>;

    /// Every block (active and cancelled) belonging to a source; the
    /// sync diff needs the cancelled rows to resurrect reappearing ids.
    async fn for_source(
        &self,
        source_id: Uuid,
    ) -> Result<Vec<CalendarBlock>, Box<dyn std::error::Error + Send + Sync>>;

    /// Look up one block by its stable external reference.
    async fn find_by_ref(
        &self,
        property_id: Uuid,
        external_ref: &str,
    ) -> Result<Option<CalendarBlock>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for seasonal pricing/min-stay rules
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn insert(
        &self,
        rule: &SeasonalRule,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Rules overlapping the range for one property.
    async fn for_property(
        &self,
        property_id: Uuid,
        range: &StayRange,
    ) -> Result<Vec<SeasonalRule>, Box<dyn std::error::Error + Send + Sync>>;
}
