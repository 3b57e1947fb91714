use time::OffsetDateTime;

/// On-disk metadata captured at enumeration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub mtime: OffsetDateTime,
    pub mime: Option<String>,
}

impl FileStat {
    /// Empty files with no recognizable type carry nothing worth versioning
    pub fn is_untyped_empty(&self) -> bool {
        self.size == 0 && self.mime.is_none()
    }
}

/// A root-relative file, or a synthesized deletion when `stat` is absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: String,
    pub stat: Option<FileStat>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>, stat: FileStat) -> Self {
        Self { path: path.into(), stat: Some(stat) }
    }

    pub fn deletion(path: impl Into<String>) -> Self {
        Self { path: path.into(), stat: None }
    }

    pub fn is_deletion(&self) -> bool {
        self.stat.is_none()
    }

    /// Declared size used for batching; deletions count as zero
    pub fn size(&self) -> u64 {
        self.stat.as_ref().map_or(0, |s| s.size)
    }

    pub fn mtime(&self) -> Option<OffsetDateTime> {
        self.stat.as_ref().map(|s| s.mtime)
    }
}
