// Search Index Module
//
// Thin client for the Elasticsearch REST API. The index holds one
// denormalized document per SKU and is not a system of record: it is deleted
// and rebuilt wholesale on every ingestion run, so the client only needs
// create/delete/upsert/refresh plus the more-like-this similarity query.

pub mod index;

// Re-export main types
pub use index::{SearchIndex, SimilarSeed, SkuDocument};

/// Result type for search index operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the search index client
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request rejected by the search index (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed search response: {0}")]
    InvalidResponse(String),
}
