use async_trait::async_trait;
use uuid::Uuid;

/// Fire-and-forget notification seam. A delivery failure must never
/// fail the booking operation that raised it; callers log and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        booking_id: Uuid,
        event_type: &str,
        message: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
