//! Error types shared across the catfeed workspace

use thiserror::Error;

/// Result type alias for catfeed operations
pub type Result<T> = std::result::Result<T, CatfeedError>;

/// Main error type for catfeed
#[derive(Error, Debug)]
pub enum CatfeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}
