//! Artifact metadata and per-dispatch diagnostics.

use crate::error::DocpressError;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

/// A stored document and its PDF rendering.
///
/// Returned by [`crate::service::ConvertService::store_and_convert`]. The
/// `id` is the only durable handle: both paths are derived from it by a
/// fixed suffix convention (`{id}-orig.{ext}`, `{id}.pdf`) and can be
/// re-derived after a process restart without any index.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Opaque, collision-resistant token. Contains no path separators and is
    /// safe to use directly as a filesystem path component.
    pub id: String,
    /// Caller-supplied name. Advisory only; never trusted for path
    /// construction beyond extension extraction.
    pub original_filename: String,
    /// Media type produced by content sniffing, not by the caller's claim.
    pub media_type: String,
    /// Location of the stored original.
    pub original_path: PathBuf,
    /// Location of the converted PDF. Exists iff conversion completed.
    pub pdf_path: PathBuf,
}

/// One strategy dispatch and its outcome. Transient, never persisted;
/// exists so every conversion leaves a uniform diagnostic trail regardless
/// of which strategy ran. Engine attempts carry the captured exit code and
/// combined process output inside the error variants.
#[derive(Debug)]
pub struct ConversionAttempt {
    /// Identifier of the selected strategy.
    pub strategy: &'static str,
    /// Success, or the failure with its cause chain.
    pub outcome: Result<(), DocpressError>,
}

impl ConversionAttempt {
    pub fn new(strategy: &'static str, outcome: Result<(), DocpressError>) -> Self {
        Self { strategy, outcome }
    }

    /// Log the attempt and surface the outcome to the caller.
    pub fn log(self, filename: &str) -> Result<(), DocpressError> {
        match &self.outcome {
            Ok(()) => {
                info!(strategy = self.strategy, file = %filename, "conversion succeeded");
            }
            Err(e) => {
                error!(
                    strategy = self.strategy,
                    file = %filename,
                    kind = e.kind(),
                    error = %e,
                    "conversion failed"
                );
            }
        }
        self.outcome
    }
}
