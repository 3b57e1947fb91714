// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;
use tempfile::TempDir;
use time::OffsetDateTime;

use treesync::model::{
    AddVersionsOptions, AddVersionsResult, CommittedRecord, FileDescriptor, FileStat, RecordQuery,
    StoredRecordSummary, VersionRecord,
};
use treesync::repository::sync::{StoreAdapter, SyncEvent};
use treesync::repository::{Database, LocalStore};

/// Create an in-memory test database with initialized schema
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Create a scratch directory to synchronize
pub fn create_test_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().canonicalize().unwrap();
    (dir, root)
}

/// LocalStore over `root` backed by an in-memory database
pub async fn create_local_store(root: &Path) -> LocalStore {
    LocalStore::new(root, create_test_db().await)
}

/// Write a file under `root`, creating parent directories
pub fn write_file(root: &Path, path: &str, content: &[u8]) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&full, content).unwrap();
}

/// Set a file's modification time
pub fn set_mtime(root: &Path, path: &str, at: OffsetDateTime) {
    let file = std::fs::File::options()
        .write(true)
        .open(root.join(path))
        .unwrap();
    file.set_modified(SystemTime::from(at)).unwrap();
}

pub fn stat(size: u64, mtime: OffsetDateTime, mime: Option<&str>) -> FileStat {
    FileStat {
        size,
        mtime,
        mime: mime.map(str::to_string),
    }
}

pub fn text_file(path: &str, size: u64, mtime: OffsetDateTime) -> FileDescriptor {
    FileDescriptor::new(path, stat(size, mtime, Some("text/plain")))
}

/// Content record as a previous run would have stored it
pub fn stored(path: &str, date: OffsetDateTime) -> VersionRecord {
    VersionRecord::content(path, stat(1, date, Some("text/plain")), b"x".to_vec())
}

/// Compact, owned form of a notification for assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    FilesFound(Vec<String>),
    ProcessBatch(Vec<String>),
    Progress(usize, usize),
    End(bool),
}

/// Collects notifications in order
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Seen>>,
}

impl Recorder {
    pub fn observe(&self, event: &SyncEvent<'_>) {
        let seen = match event {
            SyncEvent::FilesFound(changes) => {
                Seen::FilesFound(changes.iter().map(|c| c.path.clone()).collect())
            }
            SyncEvent::ProcessBatch(batch) => {
                Seen::ProcessBatch(batch.entries().iter().map(|c| c.path.clone()).collect())
            }
            SyncEvent::Progress(p) => Seen::Progress(p.loaded, p.total),
            SyncEvent::End(err) => Seen::End(err.is_some()),
        };
        self.events.lock().unwrap().push(seen);
    }

    pub fn events(&self) -> Vec<Seen> {
        self.events.lock().unwrap().clone()
    }
}

/// In-memory StoreAdapter with failure injection.
///
/// Files are read from `root` on disk; the walk result is whatever the
/// test puts in `files`.
pub struct MemoryStore {
    root: PathBuf,
    pub files: Vec<FileDescriptor>,
    pub records: Mutex<Vec<VersionRecord>>,
    pub fail_walk: AtomicBool,
    pub fail_lookups: AtomicBool,
    /// Fail the Nth (0-based) add_versions call
    pub fail_add_at: Mutex<Option<usize>>,
    pub add_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            files: Vec::new(),
            records: Mutex::new(Vec::new()),
            fail_walk: AtomicBool::new(false),
            fail_lookups: AtomicBool::new(false),
            fail_add_at: Mutex::new(None),
            add_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_files(mut self, files: Vec<FileDescriptor>) -> Self {
        self.files = files;
        self
    }

    pub fn with_records(self, records: Vec<VersionRecord>) -> Self {
        *self.records.lock().unwrap() = records;
        self
    }

    pub fn records(&self) -> Vec<VersionRecord> {
        self.records.lock().unwrap().clone()
    }

    fn matches(query: &RecordQuery, all: &[VersionRecord]) -> Vec<StoredRecordSummary> {
        let candidates: Vec<&VersionRecord> = if query.newest {
            let mut latest: Vec<&VersionRecord> = Vec::new();
            for rec in all {
                match latest.iter().position(|r| r.path == rec.path) {
                    Some(i) => latest[i] = rec,
                    None => latest.push(rec),
                }
            }
            latest
        } else {
            all.iter().collect()
        };

        candidates
            .into_iter()
            .filter(|r| match query.exists {
                Some(true) => !r.is_deletion(),
                Some(false) => r.is_deletion(),
                None => true,
            })
            .filter(|r| query.paths.as_ref().is_none_or(|p| p.contains(&r.path)))
            .map(|r| StoredRecordSummary { path: r.path.clone(), date: r.date })
            .collect()
    }
}

impl StoreAdapter for MemoryStore {
    fn root_directory(&self) -> &Path {
        &self.root
    }

    async fn walk_files(&self) -> Result<Vec<FileDescriptor>> {
        if self.fail_walk.load(Ordering::SeqCst) {
            bail!("permission denied");
        }
        Ok(self.files.clone())
    }

    async fn get_records(&self, query: &RecordQuery) -> Result<Vec<StoredRecordSummary>> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        // Let other lookups start before this one completes
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(Self::matches(query, &self.records.lock().unwrap()))
    }

    async fn create_version_record(&self, record: &VersionRecord) -> Result<CommittedRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(CommittedRecord { id: records.len() as i64 })
    }

    async fn add_versions(
        &self,
        records: &[VersionRecord],
        options: AddVersionsOptions,
    ) -> Result<AddVersionsResult> {
        let call = self.add_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_add_at.lock().unwrap() == Some(call) {
            bail!("disk full");
        }

        let mut stored = self.records.lock().unwrap();
        let mut result = AddVersionsResult::default();
        for rec in records {
            let duplicate = stored
                .iter()
                .any(|s| s.path == rec.path && s.date == rec.date && s.change == rec.change);
            if options.only_import_new && duplicate {
                result.ignored += 1;
            } else {
                stored.push(rec.clone());
                result.inserted += 1;
            }
        }
        Ok(result)
    }
}
