use clap::Parser;
use std::path::PathBuf;

use treesync::repository::sync::SyncConfig;

const MIB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "treesync", about = "Mirror a directory tree into a version history")]
pub struct Cli {
    /// Directory to synchronize
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Version database (defaults to a per-directory file in the cache dir)
    #[arg(long, env = "TREESYNC_DB")]
    pub db: Option<PathBuf>,

    /// Soft limit on file content per committed batch, in MiB
    #[arg(long, default_value_t = 64)]
    pub ceiling_mib: u64,

    /// Paths per store lookup during change detection
    #[arg(long, default_value_t = 50)]
    pub lookup_chunk: usize,

    /// Store lookups in flight at once
    #[arg(long, default_value_t = 3)]
    pub lookup_concurrency: usize,

    /// Print the change set without committing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the stored versions of a root-relative path and exit
    #[arg(long, value_name = "PATH")]
    pub history: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::default()
            .with_batch_ceiling(self.ceiling_mib.saturating_mul(MIB))
            .with_lookup_chunk_size(self.lookup_chunk)
            .with_lookup_concurrency(self.lookup_concurrency)
    }
}
