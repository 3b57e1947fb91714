use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::FileStat;

/// Kind of change a version record represents.
///
/// Creations and modifications are implied by the presence of content,
/// so only deletions are tagged explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Deletion,
}

impl Change {
    pub fn as_str(self) -> &'static str {
        match self {
            Change::Deletion => "deletion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deletion" => Some(Change::Deletion),
            _ => None,
        }
    }
}

/// Latest known version metadata for a path, without content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecordSummary {
    pub path: String,
    pub date: OffsetDateTime,
}

/// One snapshot of a file (or of its removal) handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub path: String,
    pub change: Option<Change>,
    pub date: OffsetDateTime,
    pub stat: Option<FileStat>,
    pub content: Option<Vec<u8>>,
}

impl VersionRecord {
    /// Creation or modification carrying the file's content and stat
    pub fn content(path: impl Into<String>, stat: FileStat, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            change: None,
            date: stat.mtime,
            stat: Some(stat),
            content: Some(content),
        }
    }

    /// Deletion marker dated `at`, truncated to whole seconds
    pub fn deletion_at(path: impl Into<String>, at: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            change: Some(Change::Deletion),
            date: truncate_to_seconds(at),
            stat: None,
            content: None,
        }
    }

    pub fn deletion(path: impl Into<String>) -> Self {
        Self::deletion_at(path, OffsetDateTime::now_utc())
    }

    pub fn is_deletion(&self) -> bool {
        self.change == Some(Change::Deletion)
    }
}

fn truncate_to_seconds(at: OffsetDateTime) -> OffsetDateTime {
    at - Duration::nanoseconds(i64::from(at.nanosecond()))
}

/// Filter for record lookups.
///
/// Results are always projected to `{path, date}` summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Restrict to these paths
    pub paths: Option<Vec<String>>,
    /// Only the latest version of each path
    pub newest: bool,
    /// `Some(true)`: only paths whose record is not a deletion;
    /// `Some(false)`: only deletions
    pub exists: Option<bool>,
}

impl RecordQuery {
    pub fn newest() -> Self {
        Self { newest: true, ..Self::default() }
    }

    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.paths = Some(paths);
        self
    }

    pub fn existing(mut self) -> Self {
        self.exists = Some(true);
        self
    }
}

/// Identity the store assigned to a persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedRecord {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddVersionsOptions {
    /// Skip records equivalent to a version the store already holds
    pub only_import_new: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddVersionsResult {
    pub inserted: usize,
    pub ignored: usize,
}
