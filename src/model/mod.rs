mod file;
mod record;

pub use file::{FileDescriptor, FileStat};
pub use record::{
    AddVersionsOptions, AddVersionsResult, Change, CommittedRecord, RecordQuery,
    StoredRecordSummary, VersionRecord,
};
