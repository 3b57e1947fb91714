// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use time::{Duration, OffsetDateTime};
use treesync::model::{FileDescriptor, FileStat, VersionRecord};
use treesync::repository::Database;

/// Generate descriptors with a spread of sizes (1 KiB .. ~8 MiB)
pub fn generate_descriptors(num_files: usize) -> Vec<FileDescriptor> {
    (0..num_files)
        .map(|i| {
            FileDescriptor::new(
                format!("src/dir_{}/file_{}.rs", i % 100, i),
                FileStat {
                    size: 1024 * ((i as u64 * 7919) % 8192 + 1),
                    mtime: OffsetDateTime::UNIX_EPOCH + Duration::seconds(i as i64),
                    mime: Some("text/x-rust".to_string()),
                },
            )
        })
        .collect()
}

/// Generate small content records for database benchmarks
pub fn generate_records(num_records: usize) -> Vec<VersionRecord> {
    generate_descriptors(num_records)
        .into_iter()
        .map(|d| {
            let content = format!("// {}\n", d.path).into_bytes();
            let mut stat = d.stat.unwrap();
            stat.size = content.len() as u64;
            VersionRecord::content(d.path, stat, content)
        })
        .collect()
}

/// Create in-memory database for benchmarks
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}
