pub mod feed;
pub mod models;
pub mod reconciler;
pub mod repository;
pub mod sync;
pub mod worker;

pub use feed::{FeedError, FeedEvent, ParsedFeed};
pub use models::{
    BlockKind, BlockStatus, CalendarBlock, CalendarSource, RateAdjustment, SeasonalRule,
    SourceKind, SourceStatus,
};
pub use reconciler::{CalendarProjection, DayProjection, DayStatus, RangeSummary, Reconciler};
pub use repository::{BlockRepository, RuleRepository, SourceRepository};
pub use sync::{SyncEngine, SyncOutcome};
