//! Sync notifications and their observers
//!
//! Decouples the pipeline from UI concerns (indicatif).

use indicatif::{ProgressBar, ProgressStyle};

use crate::model::FileDescriptor;

use super::error::SyncError;
use super::types::Batch;

/// Running count of change entries processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    pub loaded: usize,
    pub total: usize,
}

/// Lifecycle notifications, delivered in order of occurrence
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    /// The change set, once detection completes
    FilesFound(&'a [FileDescriptor]),
    /// A batch is about to be committed
    ProcessBatch(&'a Batch),
    /// Emitted after every commit attempt, successful or not
    Progress(SyncProgress),
    /// Terminal; emitted exactly once
    End(Option<&'a SyncError>),
}

/// Receiver of sync notifications
pub trait SyncObserver {
    fn notify(&self, event: &SyncEvent<'_>);
}

impl<F: Fn(&SyncEvent<'_>)> SyncObserver for F {
    fn notify(&self, event: &SyncEvent<'_>) {
        self(event);
    }
}

impl SyncObserver for () {
    fn notify(&self, _event: &SyncEvent<'_>) {}
}

/// Indicatif progress bar for CLI usage
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {}: [{{bar:50.cyan/blue}}] {{pos}}/{{len}} {{msg}}",
                    label
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    /// An observer that draws nothing (quiet mode)
    pub fn hidden() -> Self {
        Self { bar: ProgressBar::hidden() }
    }
}

impl SyncObserver for ProgressObserver {
    fn notify(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::FilesFound(changes) => self.bar.set_length(changes.len() as u64),
            SyncEvent::ProcessBatch(batch) => {
                if let Some(first) = batch.entries().first() {
                    let short = first.path.rsplit('/').next().unwrap_or(&first.path);
                    self.bar.set_message(short.to_string());
                }
            }
            SyncEvent::Progress(p) => {
                self.bar.set_length(p.total as u64);
                self.bar.set_position(p.loaded as u64);
            }
            SyncEvent::End(_) => self.bar.finish_and_clear(),
        }
    }
}
