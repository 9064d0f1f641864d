use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{CapfetchError, Result};

/// Shared flag a caller flips to stop a running fetch
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once `cancel` has been called
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CapfetchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Per-run context owned by the caller: cancellation plus the last fetched folder
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Local>,
    token: CancellationToken,
    last_download: Mutex<Option<PathBuf>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Local::now(),
            token: CancellationToken::new(),
            last_download: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Handle that can cancel this session from another task or thread
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn check_cancelled(&self) -> Result<()> {
        self.token.check()
    }

    pub fn record_download(&self, folder: &Path) {
        if let Ok(mut last) = self.last_download.lock() {
            *last = Some(folder.to_path_buf());
        }
    }

    pub fn last_download(&self) -> Option<PathBuf> {
        self.last_download.lock().ok().and_then(|last| last.clone())
    }
}
