//! Domain types for syncing
//!
//! These types form the data contract between pipeline stages.

use serde::Serialize;

use crate::model::{AddVersionsResult, FileDescriptor};

/// Default soft ceiling on cumulative content size per batch
pub const DEFAULT_BATCH_CEILING: u64 = 64 * 1024 * 1024;

/// Tunables for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Soft maximum cumulative declared size per batch
    pub batch_ceiling: u64,
    /// Paths looked up per store query during change detection
    pub lookup_chunk_size: usize,
    /// Lookup queries in flight at once
    pub lookup_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_ceiling: DEFAULT_BATCH_CEILING,
            lookup_chunk_size: 50,
            lookup_concurrency: 3,
        }
    }
}

impl SyncConfig {
    pub fn with_batch_ceiling(mut self, bytes: u64) -> Self {
        self.batch_ceiling = bytes;
        self
    }

    pub fn with_lookup_chunk_size(mut self, n: usize) -> Self {
        self.lookup_chunk_size = n.max(1);
        self
    }

    pub fn with_lookup_concurrency(mut self, n: usize) -> Self {
        self.lookup_concurrency = n.max(1);
        self
    }
}

/// An ordered, size-bounded group of change entries committed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<FileDescriptor>,
    size: u64,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: FileDescriptor) {
        self.size += entry.size();
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FileDescriptor] {
        &self.entries
    }

    /// Cumulative declared size of the entries
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What committing one batch produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Deletions committed one by one
    pub created: usize,
    /// Result of the bulk submission
    pub imported: AddVersionsResult,
    /// Empty untyped files left out
    pub skipped: usize,
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub files_found: usize,
    pub changed: usize,
    pub deleted: usize,
    pub batches: usize,
    pub records_created: usize,
    pub duplicates_ignored: usize,
    pub skipped: usize,
    pub elapsed_ms: u128,
}

impl SyncReport {
    pub(crate) fn absorb(&mut self, outcome: &BatchOutcome) {
        self.records_created += outcome.created + outcome.imported.inserted;
        self.duplicates_ignored += outcome.imported.ignored;
        self.skipped += outcome.skipped;
    }
}
