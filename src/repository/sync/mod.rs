//! Directory-to-version-store synchronization
//!
//! Mirrors a directory tree into an append-only version history.
//!
//! # Architecture
//!
//! The pipeline is organized into layers:
//!
//! - **types**: Domain types (Batch, SyncConfig, SyncReport, etc.)
//! - **store**: StoreAdapter trait the pipeline talks to
//! - **db_store**: Local directory + SQLite implementation of StoreAdapter
//! - **detector**: New/modified/deleted classification with bounded lookups
//! - **batcher**: Size-bounded, order-preserving batching
//! - **committer**: Builds version records for one batch and submits them
//! - **progress**: Typed notifications and their observers
//! - **pipeline**: `SyncPipeline`, running the stages in strict sequence

mod batcher;
mod committer;
mod db_store;
mod detector;
mod error;
mod progress;
mod store;
mod types;

pub use batcher::plan_batches;
pub use committer::BatchCommitter;
pub use db_store::LocalStore;
pub use detector::ChangeDetector;
pub use error::SyncError;
pub use progress::{ProgressObserver, SyncEvent, SyncObserver, SyncProgress};
pub use store::StoreAdapter;
pub use types::{Batch, BatchOutcome, SyncConfig, SyncReport, DEFAULT_BATCH_CEILING};

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::model::FileDescriptor;

/// Counters for one run, owned by the pipeline while it executes
#[derive(Debug, Default)]
struct RunContext {
    loaded: usize,
    total: usize,
    report: SyncReport,
}

/// Enumerate → detect → batch → commit each batch in order
pub struct SyncPipeline {
    config: SyncConfig,
}

impl Default for SyncPipeline {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl SyncPipeline {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Run one sync, reporting to `observer`
    pub async fn run<S, O>(&self, store: &S, observer: &O) -> Result<SyncReport, SyncError>
    where
        S: StoreAdapter,
        O: SyncObserver + ?Sized,
    {
        self.run_with_callback(store, observer, |_| {}).await
    }

    /// Run one sync; `on_complete` receives the same error as the `End`
    /// notification, after it.
    ///
    /// Any error is fatal and not retried. Re-running is safe because
    /// batches are submitted with only-import-new semantics.
    pub async fn run_with_callback<S, O, F>(
        &self,
        store: &S,
        observer: &O,
        on_complete: F,
    ) -> Result<SyncReport, SyncError>
    where
        S: StoreAdapter,
        O: SyncObserver + ?Sized,
        F: FnOnce(Option<&SyncError>),
    {
        let started = Instant::now();
        let mut ctx = RunContext::default();

        let error = self.execute(store, observer, &mut ctx).await.err();

        observer.notify(&SyncEvent::End(error.as_ref()));
        on_complete(error.as_ref());

        if let Some(e) = error {
            warn!(error = ?e, loaded = ctx.loaded, total = ctx.total, "sync failed");
            return Err(e);
        }

        ctx.report.elapsed_ms = started.elapsed().as_millis();
        info!(
            changed = ctx.report.changed,
            deleted = ctx.report.deleted,
            batches = ctx.report.batches,
            created = ctx.report.records_created,
            "sync finished"
        );
        Ok(ctx.report)
    }

    /// Enumerate and detect only; nothing is committed
    pub async fn detect_changes<S: StoreAdapter>(
        &self,
        store: &S,
    ) -> Result<Vec<FileDescriptor>, SyncError> {
        let files = store.walk_files().await.map_err(SyncError::Enumeration)?;
        ChangeDetector::new(store, &self.config).detect(files).await
    }

    async fn execute<S, O>(
        &self,
        store: &S,
        observer: &O,
        ctx: &mut RunContext,
    ) -> Result<(), SyncError>
    where
        S: StoreAdapter,
        O: SyncObserver + ?Sized,
    {
        // Phase 1: Enumerate
        info!(root = %store.root_directory().display(), "enumerating files");
        let phase_start = Instant::now();
        let files = store.walk_files().await.map_err(SyncError::Enumeration)?;
        ctx.report.files_found = files.len();
        phase_done("enumerate", phase_start);

        // Phase 2: Detect
        let phase_start = Instant::now();
        let changes = ChangeDetector::new(store, &self.config).detect(files).await?;
        ctx.total = changes.len();
        ctx.report.deleted = changes.iter().filter(|c| c.is_deletion()).count();
        ctx.report.changed = ctx.total - ctx.report.deleted;
        phase_done("detect", phase_start);
        observer.notify(&SyncEvent::FilesFound(&changes));

        // Phase 3: Batch
        let batches = plan_batches(changes, self.config.batch_ceiling);
        ctx.report.batches = batches.len();
        info!(
            changes = ctx.total,
            batches = batches.len(),
            "{} changes in {} batches",
            ctx.total,
            batches.len()
        );

        // Phase 4: Commit, strictly one batch at a time
        let committer = BatchCommitter::new(store);
        for batch in &batches {
            observer.notify(&SyncEvent::ProcessBatch(batch));
            let result = committer.commit(batch).await;

            ctx.loaded += batch.len();
            observer.notify(&SyncEvent::Progress(SyncProgress {
                loaded: ctx.loaded,
                total: ctx.total,
            }));

            ctx.report.absorb(&result?);
        }

        Ok(())
    }
}

fn phase_done(name: &str, start: Instant) {
    debug!(phase = name, elapsed = ?start.elapsed(), "phase finished");
}
