//! In-process conversion strategies.
//!
//! Each submodule implements exactly one source format family as a
//! [`crate::registry::Converter`]. PDF construction is CPU-bound and runs
//! under `spawn_blocking` so a large document cannot stall the runtime's
//! worker threads.
//!
//! 1. [`text`]  — `text/*` sources, laid out line by line with `lopdf`
//! 2. [`image`] — `image/*` sources, embedded as a single full-page XObject
//!
//! Office and HTML formats are not rendered in-process; they resolve to the
//! external engine strategy ([`crate::engine`]) when it is enabled.

pub mod image;
pub mod text;

use crate::error::DocpressError;
use std::path::Path;

/// Save a finished document to `dest` without ever exposing a partial file:
/// write to a sibling temp path, then rename into place.
pub(crate) fn save_atomic(
    mut doc: lopdf::Document,
    dest: &Path,
    strategy: &'static str,
) -> Result<(), DocpressError> {
    let tmp = dest.with_extension("pdf.tmp");
    if let Err(e) = doc.save(&tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(DocpressError::ConversionFailed {
            strategy,
            detail: format!("pdf save: {e}"),
        });
    }
    std::fs::rename(&tmp, dest).map_err(|e| DocpressError::storage(dest, e))
}
