//! Store adapter trait for persistence abstraction
//!
//! Decouples the sync pipeline from how files are walked and how versions
//! are persisted.

use anyhow::Result;
use std::path::Path;

use crate::model::{
    AddVersionsOptions, AddVersionsResult, CommittedRecord, FileDescriptor, RecordQuery,
    StoredRecordSummary, VersionRecord,
};
use crate::util::normalize_path;

/// Versioned record store plus the directory tree it mirrors
///
/// This trait abstracts the store operations needed by the pipeline,
/// allowing the sync logic to be tested without a real database.
#[allow(async_fn_in_trait)]
pub trait StoreAdapter {
    /// Base directory all relative paths resolve against
    fn root_directory(&self) -> &Path;

    /// Recursively enumerate files under the root with stat metadata
    async fn walk_files(&self) -> Result<Vec<FileDescriptor>>;

    /// Canonicalize a path for comparison
    fn normalize_path(&self, path: &str) -> String {
        normalize_path(path)
    }

    /// Look up stored record summaries
    async fn get_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecordSummary>>;

    /// Persist one record
    async fn create_version_record(&self, record: &VersionRecord) -> Result<CommittedRecord>;

    /// Persist many records as one unit.
    ///
    /// On error none of `records` may be considered committed.
    async fn add_versions(
        &self,
        records: &[VersionRecord],
        options: AddVersionsOptions,
    ) -> Result<AddVersionsResult>;
}
