use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::warn;

use crate::fetch::DownloadProgress;

/// Coarse milestones reported while fetching and translating
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A caption file was parsed
    Parsed { path: PathBuf, entries: usize },
    /// Translation of `texts` caption texts is starting
    TranslationStarted { texts: usize },
    /// Batch `current` of `total` is being sent
    BatchStarted { current: usize, total: usize },
    /// A caption file was written
    Written { path: PathBuf },
    /// An existing caption file will be used instead of translating
    Reused { path: PathBuf },
    /// Update from the download program
    Download(DownloadProgress),
    /// Free-form status line
    Status(String),
}

type Callback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Delivers progress events to an optional caller callback.
///
/// A panicking callback is caught and logged; it never aborts the pipeline.
#[derive(Default)]
pub struct ProgressReporter {
    callback: Option<Callback>,
}

impl ProgressReporter {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Reporter that discards every event
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn report(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!("Progress callback panicked; ignoring");
            }
        }
    }

    pub fn status<S: Into<String>>(&self, message: S) {
        self.report(ProgressEvent::Status(message.into()));
    }
}
