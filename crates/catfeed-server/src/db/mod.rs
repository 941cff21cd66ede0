// Database Module
//
// SKU storage over PostgreSQL. The `sku` table is the system of record; the
// search index is a rebuildable projection of it. Point lookups and the
// table reset run against the pool; the streaming insert loop and the
// similarity sweep run against a caller-owned transaction.

pub mod sku;

// Re-export main types
pub use sku::{Sku, SkuStore};
