use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veranda_shared::CancellationPolicy;

/// Rate, capacity, and policy data for one property, as served by the
/// (out of scope) property service. All money is in minor units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub id: Uuid,
    pub host_id: Uuid,
    pub base_price: i64,
    pub cleaning_fee: i64,
    /// Per guest above `included_guests`, per night.
    pub extra_guest_fee: i64,
    /// Flat per stay when the party brings pets.
    pub pet_fee: i64,
    pub included_guests: u32,
    pub max_guests: u32,
    pub pets_allowed: bool,
    pub service_fee_percent: f64,
    pub tax_percent: f64,
    pub instant_book: bool,
    pub cancellation_policy: CancellationPolicy,
    pub currency: String,
}

/// Property/pricing lookup seam.
#[async_trait]
pub trait PropertyDirectory: Send + Sync {
    async fn get_property(
        &self,
        property_id: Uuid,
    ) -> Result<Option<PropertyInfo>, Box<dyn std::error::Error + Send + Sync>>;
}
