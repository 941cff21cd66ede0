// Feed Ingestion Module
//
// Handles the full ingestion pipeline for product-catalog XML feeds:
// - Feed: streaming pull parser producing an offer count, a category table,
//   and a forward-only cursor over offer records
// - Categories: parent-chain resolution into a root-to-leaf name hierarchy
// - Progress: concurrency-safe per-job progress registry with admission check
// - Pipeline: orchestration workflow (reset sinks, stream, commit, enrich)
// - Similar: post-load similarity backfill via the search index
//
// A job runs as one spawned task. The feed is read in three independent
// passes (count, categories, offers), so memory use stays constant regardless
// of feed size.

pub mod categories;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod similar;

// Re-export main types
pub use categories::{CategoryLevels, CategoryTable};
pub use feed::{count_offers, read_categories, OfferCursor};
pub use models::{Category, NewSku, Offer};
pub use pipeline::{IngestPipeline, RecordErrorPolicy};
pub use progress::{JobProgress, ProgressRegistry};
pub use similar::SimilarityEnricher;

/// Marketplace identifier stamped onto every SKU produced by this service.
pub const MARKETPLACE_ID: i32 = 1;

/// How many similar SKUs to request per record.
pub const SIMILAR_RESULT_SIZE: usize = 5;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for feed ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink reset error: {0}")]
    SinkReset(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Search index error: {0}")]
    Search(#[from] crate::search::SearchError),

    #[error("An ingestion job is already active: {0}")]
    JobActive(uuid::Uuid),
}

impl From<quick_xml::Error> for IngestError {
    fn from(err: quick_xml::Error) -> Self {
        IngestError::FeedParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for IngestError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        IngestError::FeedParse(err.to_string())
    }
}
