pub mod changes;
pub mod locks;
pub mod manager;
pub mod models;
pub mod refund;
pub mod repository;
pub mod sweeper;
pub mod worker;

pub use locks::{AvailabilityLock, AvailabilityLockManager, LockGrant};
pub use manager::BookingService;
pub use models::{
    Actor, ActorRole, Booking, BookingModification, BookingRules, BookingStatus,
    CancellationRequest, CreateBookingRequest, ModificationChange, ModificationRequest,
    ModificationStatus, PricingSnapshot, RequestedChange,
};
pub use refund::{calculate_refund, RefundBreakdown};
pub use repository::{BookingRepository, ModificationRepository};
