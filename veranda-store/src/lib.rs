pub mod app_config;
pub mod gateways;
pub mod http_feed;
pub mod memory;

pub use app_config::Config;
pub use gateways::{
    MockPaymentGateway, RecordingNotifier, StaticFeedFetcher, StaticPropertyDirectory,
};
pub use http_feed::HttpFeedFetcher;
pub use memory::{
    InMemoryBlockRepository, InMemoryBookingRepository, InMemoryModificationRepository,
    InMemoryRuleRepository, InMemorySourceRepository,
};
