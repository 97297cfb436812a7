//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod categorize;
mod category;
pub mod logging;
pub mod migration;
mod summary;
mod sync;

pub use categorize::{
    build_prompt, DelegatedCategorizer, RuleCategorizer, DEFAULT_MODEL, KEYWORD_RULES,
};
pub use category::CategoryService;
pub use logging::{now_ms, EventCount, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use summary::{CategorySpend, MonthlySummary, SummaryService, OTHER_CATEGORY};
pub use sync::{
    ItemOutcome, ItemResult, NoopObserver, SyncEvent, SyncObserver, SyncOutcome, SyncReport,
    SyncService, SyncState,
};
