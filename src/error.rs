//! Error types for the docpress library.
//!
//! One enum covers the whole conversion path, but its variants fall into two
//! groups with different lifecycles:
//!
//! * **Request-terminal** — [`DocpressError::UnsupportedFormat`],
//!   [`DocpressError::ConversionFailed`], the engine variants and
//!   [`DocpressError::Storage`]: the conversion request fails with the
//!   specific kind and cause attached. Nothing is retried automatically.
//!
//! * **Contained** — failures inside the janitor, the retention sweeper and
//!   the engine availability probe never reach a caller. They are logged via
//!   `tracing` at the point they occur and the background component carries
//!   on; [`DocpressError::EngineUnavailable`] only ever disables the engine
//!   path for the process lifetime.
//!
//! Detection failures have no variant at all: the detector is total and maps
//! anything it cannot classify to `application/octet-stream`.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docpress library.
#[derive(Debug, Error)]
pub enum DocpressError {
    // ── Dispatch errors ───────────────────────────────────────────────────
    /// No registered strategy matched the detected media type, and the
    /// external engine is disabled or unavailable.
    #[error("No converter available for '{media_type}' (filename: '{filename}')")]
    UnsupportedFormat {
        media_type: String,
        filename: String,
    },

    /// An in-process renderer failed while producing the PDF.
    #[error("Conversion via '{strategy}' failed: {detail}")]
    ConversionFailed {
        strategy: &'static str,
        detail: String,
    },

    // ── External engine errors ────────────────────────────────────────────
    /// The availability probe failed at startup. Disables the engine path
    /// for the process lifetime; never fatal to startup.
    #[error("External conversion engine not available at '{path}'")]
    EngineUnavailable { path: PathBuf },

    /// The engine exceeded its deadline and was forcibly killed.
    /// Not retried.
    #[error("External conversion engine timed out after {secs}s\nCaptured output: {output}")]
    EngineTimeout { secs: u64, output: String },

    /// The engine ran to completion but reported failure.
    #[error("External conversion engine exited with {code:?}\nCaptured output: {output}")]
    EngineFailed { code: Option<i32>, output: String },

    /// The engine exited 0 but the expected output file is absent.
    /// Distinct from [`DocpressError::EngineFailed`] for diagnosability:
    /// the engine claimed success and produced nothing usable.
    #[error("External conversion engine produced no output at '{expected}'\nCaptured output: {output}")]
    MissingEngineOutput { expected: PathBuf, output: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A filesystem operation (copy, move, write, delete) failed.
    #[error("Storage I/O failed at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DocpressError {
    /// Short stable name of the error kind, used in logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            DocpressError::UnsupportedFormat { .. } => "unsupported-format",
            DocpressError::ConversionFailed { .. } => "conversion-failed",
            DocpressError::EngineUnavailable { .. } => "engine-unavailable",
            DocpressError::EngineTimeout { .. } => "engine-timeout",
            DocpressError::EngineFailed { .. } => "engine-failed",
            DocpressError::MissingEngineOutput { .. } => "missing-engine-output",
            DocpressError::Storage { .. } => "storage-io",
            DocpressError::InvalidConfig(_) => "invalid-config",
        }
    }

    /// Wrap an `io::Error` with the path it occurred at.
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocpressError::Storage {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_display() {
        let e = DocpressError::UnsupportedFormat {
            media_type: "application/zip".into(),
            filename: "bundle.zip".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("application/zip"), "got: {msg}");
        assert!(msg.contains("bundle.zip"));
    }

    #[test]
    fn engine_failed_display_includes_output() {
        let e = DocpressError::EngineFailed {
            code: Some(77),
            output: "source file could not be loaded".into(),
        };
        assert!(e.to_string().contains("77"));
        assert!(e.to_string().contains("could not be loaded"));
    }

    #[test]
    fn missing_output_distinct_from_nonzero_exit() {
        let missing = DocpressError::MissingEngineOutput {
            expected: PathBuf::from("/tmp/x/report.pdf"),
            output: String::new(),
        };
        let failed = DocpressError::EngineFailed {
            code: Some(1),
            output: String::new(),
        };
        assert_ne!(missing.kind(), failed.kind());
    }

    #[test]
    fn storage_preserves_source() {
        use std::error::Error as _;
        let e = DocpressError::storage(
            "/srv/storage/abc.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(e.source().is_some());
        assert_eq!(e.kind(), "storage-io");
    }
}
