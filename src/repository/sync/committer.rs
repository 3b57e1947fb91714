//! Turns one batch into version records and hands them to the store

use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::model::{AddVersionsOptions, FileDescriptor, FileStat, VersionRecord};

use super::error::SyncError;
use super::store::StoreAdapter;
use super::types::{Batch, BatchOutcome};

/// Commits batches one file read at a time
pub struct BatchCommitter<'a, S> {
    store: &'a S,
    root: PathBuf,
}

impl<'a, S: StoreAdapter> BatchCommitter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            root: store.root_directory().to_path_buf(),
        }
    }

    /// Build a record for every entry, then submit them in one
    /// only-import-new call.
    ///
    /// Entries are read sequentially so at most one file's content is
    /// loaded beyond the records already built. A read error other than
    /// NotFound aborts the batch before anything is submitted.
    pub async fn commit(&self, batch: &Batch) -> Result<BatchOutcome, SyncError> {
        let mut outcome = BatchOutcome::default();
        let mut records = Vec::with_capacity(batch.len());

        for entry in batch.entries() {
            let Some(stat) = &entry.stat else {
                let record = VersionRecord::deletion(&entry.path);
                self.store
                    .create_version_record(&record)
                    .await
                    .map_err(SyncError::Commit)?;
                outcome.created += 1;
                continue;
            };

            match self.build_record(entry, stat).await? {
                Some(record) => records.push(record),
                None => outcome.skipped += 1,
            }
        }

        if !records.is_empty() {
            outcome.imported = self
                .store
                .add_versions(&records, AddVersionsOptions { only_import_new: true })
                .await
                .map_err(SyncError::Commit)?;
        }

        debug!(
            entries = batch.len(),
            created = outcome.created,
            inserted = outcome.imported.inserted,
            ignored = outcome.imported.ignored,
            skipped = outcome.skipped,
            "batch committed"
        );
        Ok(outcome)
    }

    async fn build_record(
        &self,
        entry: &FileDescriptor,
        stat: &FileStat,
    ) -> Result<Option<VersionRecord>, SyncError> {
        let content = match tokio::fs::read(self.root.join(&entry.path)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %entry.path, "file vanished before read, recording deletion");
                return Ok(Some(VersionRecord::deletion(&entry.path)));
            }
            Err(source) => {
                return Err(SyncError::Read { path: entry.path.clone(), source });
            }
        };

        if stat.is_untyped_empty() {
            info!(path = %entry.path, "skipping empty file with unknown type");
            return Ok(None);
        }

        Ok(Some(VersionRecord::content(&entry.path, stat.clone(), content)))
    }
}
