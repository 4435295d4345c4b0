//! Cleanup of stale engine coordination artifacts.
//!
//! The external office engine drops `.~lock.*#` marker files next to the
//! documents it opens, and an abnormally terminated invocation leaves its
//! `libreconv-*` scratch directory behind. Either can block or confuse the
//! next invocation, so the engine adapter runs this janitor before every
//! job.
//!
//! Both passes are best-effort: every deletion failure is logged and the
//! scan moves on. A janitor failure must never fail the conversion that
//! triggered it.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Prefix of engine lock marker files.
const LOCK_PREFIX: &str = ".~lock";

/// Prefix of per-job scratch directories created by the engine adapter.
pub(crate) const SCRATCH_PREFIX: &str = "libreconv-";

/// Remove stale lock markers and abandoned scratch directories under
/// `storage_dir`. Scratch directories are only removed once their
/// last-modified time is older than `stale_after`; lock markers are removed
/// unconditionally. Returns the number of entries removed.
pub async fn clean(storage_dir: &Path, stale_after: Duration) -> usize {
    let mut read_dir = match tokio::fs::read_dir(storage_dir).await {
        Ok(rd) => rd,
        Err(e) => {
            warn!(dir = %storage_dir.display(), error = %e, "janitor scan failed");
            return 0;
        }
    };

    let cutoff = SystemTime::now().checked_sub(stale_after);
    let mut removed = 0;

    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let path = entry.path();

        if name.starts_with(LOCK_PREFIX) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(file = %path.display(), "removed stale engine lock file");
                    removed += 1;
                }
                Err(e) => warn!(file = %path.display(), error = %e, "could not remove lock file"),
            }
            continue;
        }

        if name.starts_with(SCRATCH_PREFIX) && path.is_dir() {
            if !is_older_than(&path, cutoff).await {
                continue;
            }
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    debug!(dir = %path.display(), "removed abandoned scratch directory");
                    removed += 1;
                }
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "could not remove scratch directory")
                }
            }
        }
    }

    removed
}

/// Whether the entry's mtime is strictly before the cutoff. Unreadable
/// metadata counts as "not stale" so the entry is left alone.
async fn is_older_than(path: &Path, cutoff: Option<SystemTime>) -> bool {
    let Some(cutoff) = cutoff else { return false };
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(mtime) => mtime < cutoff,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read mtime");
            false
        }
    }
}
