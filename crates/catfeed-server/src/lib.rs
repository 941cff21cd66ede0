//! Catfeed Server Library
//!
//! HTTP service that ingests product-catalog XML feeds into PostgreSQL and an
//! Elasticsearch index, then backfills a "similar items" relation per SKU via
//! a more-like-this query.
//!
//! # Overview
//!
//! - **Feed ingestion**: streaming XML parsing with constant memory use,
//!   category hierarchy resolution, and per-job progress tracking
//! - **Search index**: one denormalized document per SKU, rebuilt wholesale on
//!   each ingestion run
//! - **Similarity backfill**: after a successful load, every SKU's five
//!   closest neighbours (by name/description/vendor text similarity) are
//!   written back onto the record
//! - **API endpoints**: feed file management, job submission, progress
//!   polling, SKU lookup
//!
//! # Job lifecycle
//!
//! `POST /process` registers a job and spawns the pipeline as a background
//! task; the caller polls `GET /progress/:job_id`. Both sinks are reset at the
//! start of every run, so a failed job leaves no state the next successful run
//! will not overwrite. At most one ingestion job is admitted at a time.
//!
//! # Framework Stack
//!
//! - **Axum**: HTTP surface
//! - **SQLx**: PostgreSQL storage
//! - **quick-xml**: streaming feed parsing
//! - **reqwest**: Elasticsearch REST client

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod search;

// Re-export commonly used types
pub use error::{AppError, AppResult};
