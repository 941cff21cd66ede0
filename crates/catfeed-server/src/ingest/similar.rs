//! Similarity backfill
//!
//! Second ingestion phase, run after the streaming load has committed and the
//! index has been refreshed. Sweeps every persisted SKU, asks the search
//! index for its nearest neighbours by text relevance, and writes the result
//! back in one transaction.

use tracing::{debug, info};
use uuid::Uuid;

use super::progress::ProgressRegistry;
use super::{Result, SIMILAR_RESULT_SIZE};
use crate::db::{sku, SkuStore};
use crate::search::{SearchIndex, SimilarSeed};

/// Backfills the related-record set for every SKU of a completed load.
pub struct SimilarityEnricher<'a> {
    store: &'a SkuStore,
    search: &'a SearchIndex,
    progress: &'a ProgressRegistry,
}

impl<'a> SimilarityEnricher<'a> {
    pub fn new(
        store: &'a SkuStore,
        search: &'a SearchIndex,
        progress: &'a ProgressRegistry,
    ) -> Self {
        Self {
            store,
            search,
            progress,
        }
    }

    /// Run the sweep, publishing enrichment progress as it goes.
    ///
    /// Each record's similar set is overwritten, so re-running the sweep
    /// replaces stale results rather than appending to them.
    pub async fn run(&self, job_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let records = sku::fetch_all(&mut tx).await?;
        let total = records.len();
        info!(%job_id, total, "Starting similarity backfill");

        for (processed, record) in records.iter().enumerate() {
            let seed = SimilarSeed {
                name: record.title.clone(),
                description: record.description.clone(),
                vendor: record.brand.clone(),
            };
            let similar = self
                .search
                .find_similar(&seed, record.uuid, SIMILAR_RESULT_SIZE)
                .await?;
            debug!(uuid = %record.uuid, found = similar.len(), "Resolved similar records");

            sku::set_similar(&mut tx, record.uuid, &similar).await?;
            self.progress
                .set_enrich(job_id, sweep_pct(processed + 1, total));
        }

        tx.commit().await?;
        self.progress.set_enrich(job_id, 100.0);
        info!(%job_id, total, "Similarity backfill committed");
        Ok(())
    }
}

fn sweep_pct(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (processed as f64 / total as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_pct_empty_table_completes() {
        assert_eq!(sweep_pct(0, 0), 100.0);
    }

    #[test]
    fn test_sweep_pct_progression() {
        assert_eq!(sweep_pct(1, 2), 50.0);
        assert_eq!(sweep_pct(2, 2), 100.0);
    }
}
