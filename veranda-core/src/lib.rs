pub mod directory;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod payment;

pub use directory::{PropertyDirectory, PropertyInfo};
pub use error::{WorkflowError, WorkflowResult};
pub use fetch::FeedFetcher;
pub use notify::Notifier;
pub use payment::PaymentGateway;
