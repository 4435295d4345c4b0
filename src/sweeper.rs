//! Time-based artifact eviction.
//!
//! The sweeper is the only component allowed to delete artifacts outside
//! the conversion path's own writes. It runs on its own periodic schedule,
//! uncoordinated with in-flight requests: the known residual race (a
//! reader holding a path the sweeper judges old) is tolerable because the
//! retention window is measured in days while a conversion completes in
//! seconds. Entries are evaluated and deleted independently; one failure
//! never aborts the rest of the scan.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Deletes storage entries older than the retention window.
pub struct RetentionSweeper {
    storage_dir: PathBuf,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(storage_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            retention,
        }
    }

    /// One full scan of the storage root. Returns how many entries were
    /// deleted. Never fails: unreadable entries are logged and skipped.
    pub async fn run_once(&self) -> usize {
        let Some(cutoff) = SystemTime::now().checked_sub(self.retention) else {
            return 0;
        };

        let mut read_dir = match tokio::fs::read_dir(&self.storage_dir).await {
            Ok(rd) => rd,
            Err(e) => {
                warn!(dir = %self.storage_dir.display(), error = %e, "retention scan failed");
                return 0;
            }
        };

        let mut deleted = 0;
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read entry mtime");
                    continue;
                }
            };
            if modified >= cutoff {
                continue;
            }

            let result = if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => {
                    info!(path = %path.display(), "deleted expired storage entry");
                    deleted += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "could not delete entry"),
            }
        }
        deleted
    }

    /// Run the sweeper forever on a fixed period.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let deleted = self.run_once().await;
                if deleted > 0 {
                    info!(deleted, "retention sweep complete");
                }
            }
        })
    }
}
