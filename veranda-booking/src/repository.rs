use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Booking, BookingModification, BookingStatus};

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Plain field update with no status change.
    async fn update(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Compare-and-set write: persists `booking` only when the stored
    /// status still equals `expected`. Returns false when a racing
    /// transition won.
    async fn update_if_status(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for booking modification requests
#[async_trait]
pub trait ModificationRepository: Send + Sync {
    async fn insert(
        &self,
        modification: &BookingModification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<BookingModification>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update(
        &self,
        modification: &BookingModification,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_pending(
        &self,
    ) -> Result<Vec<BookingModification>, Box<dyn std::error::Error + Send + Sync>>;
}
