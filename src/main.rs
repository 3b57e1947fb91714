mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use treesync::repository::sync::{ProgressObserver, SyncReport};
use treesync::repository::{Database, LocalStore, SyncPipeline};
use treesync::util::{format_size, format_timestamp, normalize_path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = fs::canonicalize(&cli.root)
        .with_context(|| format!("Could not resolve path: {}", cli.root.display()))?;
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path(&root)?,
    };
    info!(db = %db_path.display(), "using version store");

    // Connect to database
    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    db.init_schema().await?;

    // The database may live inside the synchronized tree
    let db_abs = fs::canonicalize(&db_path).unwrap_or(db_path);
    let mut store = LocalStore::new(&root, db);
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut name = db_abs.clone().into_os_string();
        name.push(suffix);
        store = store.excluding(name);
    }

    if let Some(path) = &cli.history {
        return print_history(store.database(), &normalize_path(path)).await;
    }

    let pipeline = SyncPipeline::new(cli.sync_config());
    let last_sync = store.database().get_metadata("last_sync").await;

    if cli.dry_run {
        let changes = pipeline.detect_changes(&store).await?;
        for change in &changes {
            match &change.stat {
                Some(stat) => println!("M {} ({})", change.path, format_size(stat.size)),
                None => println!("D {}", change.path),
            }
        }
        eprintln!(
            "{} changes since {} (dry run)",
            changes.len(),
            last_sync.as_deref().unwrap_or("the first sync")
        );
        return Ok(());
    }

    let observer = if cli.quiet || cli.json {
        ProgressObserver::hidden()
    } else {
        ProgressObserver::new("Syncing")
    };
    let report = pipeline.run(&store, &observer).await.context("Sync failed")?;

    store
        .database()
        .set_metadata("last_sync", &format_timestamp(OffsetDateTime::now_utc()))
        .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, last_sync.as_deref());
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("treesync={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Unique database file per root, under the user cache directory
fn default_db_path(root: &Path) -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .context("Could not determine cache directory")?
        .join("treesync");
    fs::create_dir_all(&cache_dir)?;

    let root_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("root");
    let mut hasher = DefaultHasher::new();
    root.hash(&mut hasher);
    let hash = hasher.finish();
    Ok(cache_dir.join(format!("{}_{:016x}.db", root_name, hash)))
}

async fn print_history(db: &Database, path: &str) -> Result<()> {
    let versions = db.history(path).await?;
    if versions.is_empty() {
        println!("No versions recorded for {}", path);
        return Ok(());
    }

    for v in versions {
        let what = match (v.change, v.content_len) {
            (Some(change), _) => change.as_str().to_string(),
            (None, Some(len)) => format_size(len.max(0) as u64),
            (None, None) => "-".to_string(),
        };
        println!("#{:<6} {}  {}", v.id, format_timestamp(v.date), what);
    }
    Ok(())
}

fn print_report(report: &SyncReport, last_sync: Option<&str>) {
    if let Some(at) = last_sync {
        println!("previous sync: {}", at);
    }
    println!(
        "{} files found, {} changed, {} deleted",
        report.files_found, report.changed, report.deleted
    );
    println!(
        "{} batches, {} versions recorded, {} duplicates ignored, {} skipped ({} ms)",
        report.batches,
        report.records_created,
        report.duplicates_ignored,
        report.skipped,
        report.elapsed_ms
    );
}
