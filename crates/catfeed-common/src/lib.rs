//! Catfeed Common Library
//!
//! Shared error handling and logging initialization for the catfeed
//! workspace.
//!
//! # Example
//!
//! ```no_run
//! use catfeed_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> catfeed_common::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CatfeedError, Result};
