//! Ingestion pipeline orchestration
//!
//! One job moves a feed file through four phases:
//!
//! 1. Pre-passes: count offers, then build the category table
//! 2. Sink reset: recreate the search index and truncate the SKU table
//! 3. Streaming load: one transaction inserting SKUs and indexing documents,
//!    publishing ingest progress per record
//! 4. Similarity backfill over the committed data
//!
//! The load transaction commits before the index is refreshed, so a query
//! never observes documents for uncommitted rows. A failure in any phase
//! marks the job with the failure sentinel and releases the admission slot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::feed::{count_offers, read_categories, OfferCursor};
use super::models::{NewSku, Offer};
use super::progress::ProgressRegistry;
use super::similar::SimilarityEnricher;
use super::{CategoryLevels, CategoryTable, IngestError, Result};
use crate::db::{sku, SkuStore};
use crate::search::{SearchIndex, SkuDocument};

/// What to do when a single offer cannot be turned into a record.
///
/// Only record-build failures (malformed offer data) are subject to the
/// policy; storage and search errors always fail the job, since the load
/// transaction is already poisoned at that point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordErrorPolicy {
    /// Abort the job on the first malformed record
    #[default]
    FailJob,
    /// Log the record and continue with the rest of the feed
    SkipAndLog,
}

/// Orchestrates ingestion jobs over the shared sinks.
#[derive(Debug)]
pub struct IngestPipeline {
    store: SkuStore,
    search: SearchIndex,
    progress: Arc<ProgressRegistry>,
    policy: RecordErrorPolicy,
}

impl IngestPipeline {
    pub fn new(store: SkuStore, search: SearchIndex, progress: Arc<ProgressRegistry>) -> Self {
        Self {
            store,
            search,
            progress,
            policy: RecordErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RecordErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Admit and start a job for the given feed file.
    ///
    /// Returns the job id immediately; the work runs on a spawned task and
    /// reports through the progress registry. Rejects with
    /// [`IngestError::JobActive`] while another job is running.
    pub fn start_job(self: &Arc<Self>, path: PathBuf) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        self.progress.begin(job_id)?;

        info!(%job_id, path = %path.display(), "Starting ingestion job");

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = pipeline.run(job_id, &path).await {
                error!(%job_id, error = %err, "Ingestion job failed");
                pipeline.progress.fail(job_id);
            }
        });

        Ok(job_id)
    }

    async fn run(&self, job_id: Uuid, path: &Path) -> Result<()> {
        let total = count_offers(path)?;
        let categories = read_categories(path)?;
        info!(%job_id, total, categories = categories.len(), "Feed pre-passes complete");

        // Both sinks are rebuilt from scratch on every run; the previous
        // contents are gone before the first record lands.
        self.search
            .reset()
            .await
            .map_err(|err| IngestError::SinkReset(err.to_string()))?;
        self.store
            .reset()
            .await
            .map_err(|err| IngestError::SinkReset(err.to_string()))?;

        let mut tx = self.store.begin().await?;
        let mut cursor = OfferCursor::open(path)?;
        let mut processed: u64 = 0;

        while let Some(offer) = cursor.next()? {
            processed += 1;
            match self.load_offer(&mut tx, &offer, &categories).await {
                Ok(()) => {}
                Err(IngestError::FeedParse(reason))
                    if self.policy == RecordErrorPolicy::SkipAndLog =>
                {
                    warn!(%job_id, offer_id = %offer.offer_id, %reason, "Skipping malformed offer");
                }
                Err(err) => return Err(err),
            }
            self.progress.set_ingest(job_id, pct(processed, total));
        }

        tx.commit().await?;
        self.search.refresh().await?;
        // Explicit final value: an empty feed still reaches 100.
        self.progress.set_ingest(job_id, 100.0);
        info!(%job_id, processed, "Streaming load committed");

        // The load is durable at this point, so a backfill error cannot roll
        // it back; the records stay committed but the job itself fails and
        // carries the sentinel like any other phase error.
        let enricher = SimilarityEnricher::new(&self.store, &self.search, &self.progress);
        enricher.run(job_id).await?;

        self.progress.finish(job_id);
        info!(%job_id, "Ingestion job finished");
        Ok(())
    }

    async fn load_offer(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        offer: &Offer,
        categories: &CategoryTable,
    ) -> Result<()> {
        let levels = match offer.category_id.as_deref() {
            Some(id) => CategoryLevels::split(&categories.hierarchy(id)),
            None => CategoryLevels::default(),
        };
        let record = NewSku::from_offer(offer, &levels)?;

        if !sku::insert_if_absent(tx, &record).await? {
            debug!(product_id = record.product_id, "Duplicate product id, record skipped");
            return Ok(());
        }
        self.search
            .index_document(&SkuDocument::project(&record))
            .await?;
        Ok(())
    }
}

fn pct(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (processed as f64 / total as f64 * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_fails_job() {
        assert_eq!(RecordErrorPolicy::default(), RecordErrorPolicy::FailJob);
    }

    #[test]
    fn test_pct_bounds() {
        assert_eq!(pct(0, 0), 100.0);
        assert_eq!(pct(1, 4), 25.0);
        assert_eq!(pct(4, 4), 100.0);
        assert_eq!(pct(5, 4), 100.0);
    }
}
