mod database;
pub mod sync;

pub use database::{Database, StoredVersion};
pub use sync::{LocalStore, SyncPipeline};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
