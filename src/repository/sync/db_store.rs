//! Local directory + SQLite implementation of StoreAdapter

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::model::{
    AddVersionsOptions, AddVersionsResult, CommittedRecord, FileDescriptor, FileStat, RecordQuery,
    StoredRecordSummary, VersionRecord,
};
use crate::repository::Database;
use crate::util::{guess_mime, relative_path_string};

use super::store::StoreAdapter;

/// A directory tree mirrored into a version database
pub struct LocalStore {
    root: PathBuf,
    db: Database,
    excluded: Vec<PathBuf>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, db: Database) -> Self {
        Self {
            root: root.into(),
            db,
            excluded: Vec::new(),
        }
    }

    /// Leave a file out of every walk (e.g. the database itself when it
    /// lives under the root). Matched against the joined absolute path.
    pub fn excluding(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn walk_root(root: &Path, excluded: &[PathBuf]) -> Result<Vec<FileDescriptor>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() || excluded.iter().any(|p| p == entry.path()) {
            continue;
        }
        if let Some(file) = describe_file(root, entry.path())? {
            files.push(file);
        }
    }

    Ok(files)
}

/// Stat one walked file. None if it vanished after the directory was read;
/// the next run reports it as deleted.
fn describe_file(root: &Path, path: &Path) -> Result<Option<FileDescriptor>> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "file vanished during walk");
            return Ok(None);
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to stat {}", path.display())),
    };
    let mtime = meta
        .modified()
        .map(OffsetDateTime::from)
        .with_context(|| format!("No modification time for {}", path.display()))?;
    let rel = path.strip_prefix(root)?;

    Ok(Some(FileDescriptor::new(
        relative_path_string(rel),
        FileStat {
            size: meta.len(),
            mtime,
            mime: guess_mime(rel),
        },
    )))
}

impl StoreAdapter for LocalStore {
    fn root_directory(&self) -> &Path {
        &self.root
    }

    async fn walk_files(&self) -> Result<Vec<FileDescriptor>> {
        let root = self.root.clone();
        let excluded = self.excluded.clone();
        tokio::task::spawn_blocking(move || walk_root(&root, &excluded))
            .await
            .context("Directory walk task failed")?
    }

    async fn get_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecordSummary>> {
        self.db.query_records(query).await
    }

    async fn create_version_record(&self, record: &VersionRecord) -> Result<CommittedRecord> {
        let id = self.db.insert_version(record).await?;
        Ok(CommittedRecord { id })
    }

    async fn add_versions(
        &self,
        records: &[VersionRecord],
        options: AddVersionsOptions,
    ) -> Result<AddVersionsResult> {
        self.db.add_versions(records, options.only_import_new).await
    }
}
