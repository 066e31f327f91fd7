pub mod events;
pub mod policy;
pub mod stay;

pub use policy::CancellationPolicy;
pub use stay::{GuestCount, StayRange};
