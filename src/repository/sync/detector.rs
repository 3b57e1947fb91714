//! Change detection against the store's latest records
//!
//! Paths are looked up in fixed-size chunks with a bounded number of
//! queries in flight, then one extra query finds stored paths that are
//! gone from disk.

use futures::{stream, StreamExt, TryStreamExt};
use rustc_hash::{FxHashMap, FxHashSet};
use time::OffsetDateTime;
use tracing::debug;

use crate::model::{FileDescriptor, RecordQuery, StoredRecordSummary};

use super::error::SyncError;
use super::store::StoreAdapter;
use super::types::SyncConfig;

/// Classifies enumerated files as new, modified or deleted
pub struct ChangeDetector<'a, S> {
    store: &'a S,
    chunk_size: usize,
    concurrency: usize,
}

impl<'a, S: StoreAdapter> ChangeDetector<'a, S> {
    pub fn new(store: &'a S, config: &SyncConfig) -> Self {
        Self {
            store,
            chunk_size: config.lookup_chunk_size.max(1),
            concurrency: config.lookup_concurrency.max(1),
        }
    }

    /// Compute the change set: new or modified files in input order,
    /// followed by synthesized deletions.
    ///
    /// The first failing lookup aborts detection; nothing partial is returned.
    pub async fn detect(&self, files: Vec<FileDescriptor>) -> Result<Vec<FileDescriptor>, SyncError> {
        let files: Vec<FileDescriptor> = files
            .into_iter()
            .map(|mut f| {
                f.path = self.store.normalize_path(&f.path);
                f
            })
            .collect();

        let lookups = files.chunks(self.chunk_size).map(|chunk| {
            let paths = chunk.iter().map(|f| f.path.clone()).collect();
            let query = RecordQuery::newest().with_paths(paths);
            async move {
                let stored = self
                    .store
                    .get_records(&query)
                    .await
                    .map_err(SyncError::Lookup)?;
                Ok::<_, SyncError>(self.select_changed(chunk, stored))
            }
        });

        let mut changes: Vec<FileDescriptor> = stream::iter(lookups)
            .buffered(self.concurrency)
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flatten()
            .collect();
        let modified = changes.len();

        let deletions = self.find_deletions(&files).await?;
        debug!(
            files = files.len(),
            modified,
            deleted = deletions.len(),
            "change detection finished"
        );

        changes.extend(deletions);
        Ok(changes)
    }

    /// Files with no stored record, or whose mtime is strictly newer than
    /// the newest record's date
    fn select_changed(
        &self,
        chunk: &[FileDescriptor],
        stored: Vec<StoredRecordSummary>,
    ) -> Vec<FileDescriptor> {
        let latest: FxHashMap<String, OffsetDateTime> = stored
            .into_iter()
            .map(|r| (self.store.normalize_path(&r.path), r.date))
            .collect();

        chunk
            .iter()
            .filter(|f| match latest.get(&f.path) {
                None => true,
                Some(date) => f.mtime().is_none_or(|mtime| *date < mtime),
            })
            .cloned()
            .collect()
    }

    async fn find_deletions(&self, files: &[FileDescriptor]) -> Result<Vec<FileDescriptor>, SyncError> {
        let on_disk: FxHashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();

        let existing = self
            .store
            .get_records(&RecordQuery::newest().existing())
            .await
            .map_err(SyncError::Lookup)?;

        let mut seen = FxHashSet::default();
        Ok(existing
            .into_iter()
            .map(|r| self.store.normalize_path(&r.path))
            .filter(|path| !on_disk.contains(path.as_str()) && seen.insert(path.clone()))
            .map(FileDescriptor::deletion)
            .collect())
    }
}
