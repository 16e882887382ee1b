//! Services layer for access-service.
//!
//! Caller classification, account hierarchy, login and sessions, and
//! invalidation aggregation for completed units of work.

mod cache;
mod classifier;
mod connector;
mod directory;
pub mod error;
mod hierarchy;
mod invalidation;
mod session;

pub use cache::VersionedCache;
pub use classifier::{AccessTier, AccountClassifier};
pub use connector::{ConnectorService, LoginRequest};
pub use directory::{Directory, MemoryDirectory, PgDirectory};
pub use error::AccessError;
pub use hierarchy::AccountHierarchy;
pub use invalidation::{
    InvalidationAggregator, InvalidationBroker, InvalidationSink, InvalidationSnapshot,
    KindAggregate, KindInvalidation, MemorySink, WidenSet,
};
pub use session::{Session, SessionCache, SessionCacheStats, SessionKey, SessionToken};
