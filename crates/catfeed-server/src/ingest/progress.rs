//! Per-job progress registry
//!
//! Process-wide, concurrency-safe store mapping job id to the two progress
//! percentages a poller can observe: ingest and similarity enrichment. The
//! registry also owns job admission: at most one ingestion job is active at a
//! time, so concurrent runs can never race on the shared sinks.
//!
//! The map sits behind a plain `std::sync::Mutex`. Every operation is a
//! short, non-suspending critical section; the guard is never held across an
//! await point.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::{IngestError, Result};

/// Sentinel reported for a failed ingestion. Terminal for the job.
pub const FAILED: f64 = -1.0;

/// Progress counters for one job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobProgress {
    /// Ingest percentage in [0, 100], or -1 once the job has failed
    pub ingest_pct: f64,
    /// Enrichment percentage in [0, 100]
    pub enrich_pct: f64,
}

impl JobProgress {
    fn new() -> Self {
        Self {
            ingest_pct: 0.0,
            enrich_pct: 0.0,
        }
    }

    fn failed(&self) -> bool {
        self.ingest_pct == FAILED
    }
}

#[derive(Debug)]
struct Entry {
    progress: JobProgress,
    finished_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<Uuid, Entry>,
    active: Option<Uuid>,
}

/// Registry of job progress entries, owned by the service.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    inner: Mutex<Inner>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new job and initialize both counters to zero.
    ///
    /// Rejects with [`IngestError::JobActive`] while another job is running.
    pub fn begin(&self, job_id: Uuid) -> Result<()> {
        let mut inner = self.lock();
        if let Some(active) = inner.active {
            return Err(IngestError::JobActive(active));
        }
        inner.active = Some(job_id);
        inner.jobs.insert(
            job_id,
            Entry {
                progress: JobProgress::new(),
                finished_at: None,
            },
        );
        Ok(())
    }

    /// Current counters for a job, or `None` for an unknown id.
    pub fn get(&self, job_id: Uuid) -> Option<JobProgress> {
        self.lock().jobs.get(&job_id).map(|e| e.progress)
    }

    /// Replace the ingest percentage. Ignored once the job has failed.
    pub fn set_ingest(&self, job_id: Uuid, pct: f64) {
        let mut inner = self.lock();
        if let Some(entry) = inner.jobs.get_mut(&job_id) {
            if !entry.progress.failed() {
                entry.progress.ingest_pct = pct;
            }
        }
    }

    /// Replace the enrichment percentage. Ignored once the job has failed.
    pub fn set_enrich(&self, job_id: Uuid, pct: f64) {
        let mut inner = self.lock();
        if let Some(entry) = inner.jobs.get_mut(&job_id) {
            if !entry.progress.failed() {
                entry.progress.enrich_pct = pct;
            }
        }
    }

    /// Mark a job as failed (terminal) and release the active slot.
    pub fn fail(&self, job_id: Uuid) {
        let mut inner = self.lock();
        if let Some(entry) = inner.jobs.get_mut(&job_id) {
            entry.progress.ingest_pct = FAILED;
            entry.finished_at = Some(Instant::now());
        }
        if inner.active == Some(job_id) {
            inner.active = None;
        }
    }

    /// Mark a job as finished and release the active slot.
    pub fn finish(&self, job_id: Uuid) {
        let mut inner = self.lock();
        if let Some(entry) = inner.jobs.get_mut(&job_id) {
            entry.finished_at = Some(Instant::now());
        }
        if inner.active == Some(job_id) {
            inner.active = None;
        }
    }

    /// Drop entries for jobs finished longer than `retention` ago.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_finished(&self, retention: Duration) -> usize {
        let mut inner = self.lock();
        let before = inner.jobs.len();
        inner.jobs.retain(|_, entry| match entry.finished_at {
            Some(at) => at.elapsed() < retention,
            None => true,
        });
        before - inner.jobs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a writer panicked mid-update; the data is a
        // pair of plain floats, so continuing with it is safe.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_begin_initializes_counters() {
        let registry = ProgressRegistry::new();
        let job = Uuid::new_v4();

        registry.begin(job).unwrap();
        let progress = registry.get(job).unwrap();
        assert_eq!(progress.ingest_pct, 0.0);
        assert_eq!(progress.enrich_pct, 0.0);
    }

    #[test]
    fn test_unknown_job_is_none() {
        let registry = ProgressRegistry::new();
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_second_job_rejected_while_active() {
        let registry = ProgressRegistry::new();
        let first = Uuid::new_v4();
        registry.begin(first).unwrap();

        let err = registry.begin(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, IngestError::JobActive(id) if id == first));
    }

    #[test]
    fn test_slot_released_after_finish() {
        let registry = ProgressRegistry::new();
        let first = Uuid::new_v4();
        registry.begin(first).unwrap();
        registry.finish(first);

        assert!(registry.begin(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_slot_released_after_failure() {
        let registry = ProgressRegistry::new();
        let first = Uuid::new_v4();
        registry.begin(first).unwrap();
        registry.fail(first);

        assert!(registry.begin(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_updates_are_observable() {
        let registry = ProgressRegistry::new();
        let job = Uuid::new_v4();
        registry.begin(job).unwrap();

        registry.set_ingest(job, 42.5);
        registry.set_enrich(job, 10.0);

        let progress = registry.get(job).unwrap();
        assert_eq!(progress.ingest_pct, 42.5);
        assert_eq!(progress.enrich_pct, 10.0);
    }

    #[test]
    fn test_failure_sentinel_is_terminal() {
        let registry = ProgressRegistry::new();
        let job = Uuid::new_v4();
        registry.begin(job).unwrap();

        registry.set_ingest(job, 60.0);
        registry.fail(job);
        registry.set_ingest(job, 80.0);
        registry.set_enrich(job, 50.0);

        let progress = registry.get(job).unwrap();
        assert_eq!(progress.ingest_pct, FAILED);
        assert_eq!(progress.enrich_pct, 0.0);
    }

    #[test]
    fn test_poller_observes_non_decreasing_sequence() {
        let registry = ProgressRegistry::new();
        let job = Uuid::new_v4();
        registry.begin(job).unwrap();

        let mut last = 0.0;
        for processed in 1..=100u32 {
            registry.set_ingest(job, f64::from(processed));
            let seen = registry.get(job).unwrap().ingest_pct;
            assert!(seen >= last);
            last = seen;
        }
        assert_eq!(last, 100.0);
    }

    #[test]
    fn test_eviction_keeps_running_jobs() {
        let registry = ProgressRegistry::new();
        let done = Uuid::new_v4();
        registry.begin(done).unwrap();
        registry.finish(done);

        let running = Uuid::new_v4();
        registry.begin(running).unwrap();

        assert_eq!(registry.evict_finished(Duration::ZERO), 1);
        assert!(registry.get(done).is_none());
        assert!(registry.get(running).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_writers() {
        let registry = Arc::new(ProgressRegistry::new());
        let job = Uuid::new_v4();
        registry.begin(job).unwrap();

        let writer = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for pct in 0..=100u32 {
                    registry.set_ingest(job, f64::from(pct));
                    tokio::task::yield_now().await;
                }
            })
        };

        let reader = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let mut last = 0.0;
                for _ in 0..200 {
                    if let Some(progress) = registry.get(job) {
                        assert!(progress.ingest_pct >= last);
                        last = progress.ingest_pct;
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        writer.await.unwrap();
        reader.await.unwrap();
        assert_eq!(registry.get(job).unwrap().ingest_pct, 100.0);
    }
}
