use async_trait::async_trait;
use uuid::Uuid;

/// Payment provider seam. The booking core decides amounts; capture,
/// transfers, and provider webhooks live on the other side of this
/// trait.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge (or authorize) the given amount for a booking. Returns
    /// the provider's intent id.
    async fn process_payment(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
        currency: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Release a held security deposit after check-out.
    async fn release_security_deposit(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Execute a refund the core has already computed.
    async fn issue_refund(
        &self,
        booking_id: Uuid,
        amount_cents: i64,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
