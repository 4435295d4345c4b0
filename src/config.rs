//! Configuration for the conversion service.
//!
//! All behaviour is controlled through [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share the config across tasks, serialise it for logging, and
//! diff two deployments to understand why their behaviour differs.

use crate::error::DocpressError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::service::ConvertService`].
///
/// Built via [`ServiceConfig::builder()`] or using
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use docpress::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .storage_dir("/srv/docpress")
///     .retention_days(7)
///     .engine_enabled(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Root directory for stored originals, converted PDFs and engine
    /// scratch directories. Created on service construction. Default: `storage`.
    pub storage_dir: PathBuf,

    /// How long artifacts are retained before the sweeper deletes them.
    /// Default: 30 days.
    ///
    /// The retention window is deliberately orders of magnitude larger than
    /// a conversion takes; that gap is what makes the sweeper-vs-reader race
    /// acceptable without a lock (see [`crate::sweeper`]).
    pub retention: Duration,

    /// Period between retention sweeps. Default: 6 hours.
    pub sweep_interval: Duration,

    /// Whether to use the external headless office engine for office and
    /// HTML documents. Default: false.
    ///
    /// Enabling this only arms the availability probe; if the binary cannot
    /// be found or answers the probe too slowly, the engine path stays
    /// disabled for the process lifetime and startup proceeds normally.
    pub engine_enabled: bool,

    /// Path to the engine binary. Default: `soffice`.
    pub engine_path: PathBuf,

    /// Deadline for a single engine conversion job. On expiry the subprocess
    /// is forcibly terminated and the request fails with a timeout. Default: 60 s.
    pub engine_timeout: Duration,

    /// Deadline for the one-shot `--version` availability probe. Default: 5 s.
    pub probe_timeout: Duration,

    /// Age after which an abandoned engine scratch directory is considered
    /// stale and removable by the janitor. Default: 5 minutes.
    ///
    /// Must comfortably exceed `engine_timeout`, otherwise the janitor could
    /// remove the scratch directory of a job that is still running.
    pub stale_scratch_after: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            retention: Duration::from_secs(30 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(6 * 60 * 60),
            engine_enabled: false,
            engine_path: PathBuf::from("soffice"),
            engine_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            stale_scratch_after: Duration::from_secs(5 * 60),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    pub fn retention(mut self, window: Duration) -> Self {
        self.config.retention = window;
        self
    }

    pub fn retention_days(mut self, days: u64) -> Self {
        self.config.retention = Duration::from_secs(days * 24 * 60 * 60);
        self
    }

    pub fn sweep_interval(mut self, period: Duration) -> Self {
        self.config.sweep_interval = period;
        self
    }

    pub fn engine_enabled(mut self, v: bool) -> Self {
        self.config.engine_enabled = v;
        self
    }

    pub fn engine_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine_path = path.into();
        self
    }

    pub fn engine_timeout(mut self, deadline: Duration) -> Self {
        self.config.engine_timeout = deadline;
        self
    }

    pub fn probe_timeout(mut self, deadline: Duration) -> Self {
        self.config.probe_timeout = deadline;
        self
    }

    pub fn stale_scratch_after(mut self, age: Duration) -> Self {
        self.config.stale_scratch_after = age;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, DocpressError> {
        let c = &self.config;
        if c.storage_dir.as_os_str().is_empty() {
            return Err(DocpressError::InvalidConfig(
                "storage_dir must not be empty".into(),
            ));
        }
        if c.engine_timeout.is_zero() {
            return Err(DocpressError::InvalidConfig(
                "engine_timeout must be nonzero".into(),
            ));
        }
        if c.probe_timeout.is_zero() {
            return Err(DocpressError::InvalidConfig(
                "probe_timeout must be nonzero".into(),
            ));
        }
        if c.sweep_interval.is_zero() {
            return Err(DocpressError::InvalidConfig(
                "sweep_interval must be nonzero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = ServiceConfig::builder().build().unwrap();
        assert_eq!(c.storage_dir, PathBuf::from("storage"));
        assert_eq!(c.retention, Duration::from_secs(30 * 24 * 60 * 60));
        assert!(!c.engine_enabled);
    }

    #[test]
    fn retention_days_converts() {
        let c = ServiceConfig::builder().retention_days(7).build().unwrap();
        assert_eq!(c.retention, Duration::from_secs(7 * 24 * 60 * 60));
    }

    #[test]
    fn empty_storage_dir_rejected() {
        let err = ServiceConfig::builder().storage_dir("").build().unwrap_err();
        assert_eq!(err.kind(), "invalid-config");
    }

    #[test]
    fn zero_engine_timeout_rejected() {
        let err = ServiceConfig::builder()
            .engine_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("engine_timeout"));
    }
}
