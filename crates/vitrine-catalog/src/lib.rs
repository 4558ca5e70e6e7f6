//! Catalog core: feed decoding, row normalization, source backends, the
//! freshness cache, and the query engine.

pub mod cache;
pub mod catalog;
pub mod rows;
pub mod error;
pub mod filters;
pub mod normalize;
pub mod query;
mod retry;
pub mod sampling;
pub mod source;
pub mod table;

pub use cache::{CacheSettings, CacheState, CacheStatus, CatalogCache};
pub use catalog::Catalog;
pub use error::CatalogError;
pub use filters::{build_filter_options, is_valid_filter_value, FilterRules};
pub use normalize::{IngestReport, NormalizeRules, Rejection, RejectionCounts};
pub use sampling::{diversified_sample, SamplingConfig};
pub use source::feed::FeedClient;
pub use source::kv::{DirectoryKv, KvStore, MemoryKv};
pub use source::snapshot::{write_snapshot, SnapshotKeys, SnapshotSource};
pub use source::{RawFeed, SourceBackend};
pub use table::ProductTable;
