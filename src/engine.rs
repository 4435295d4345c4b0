//! External headless office engine adapter.
//!
//! Office and HTML documents are delegated to an out-of-process engine
//! (LibreOffice's `soffice` by default) rather than rendered in-process:
//! the legacy binary formats in particular are only handled reliably by a
//! real office implementation. The engine is slow, stateful and can wedge,
//! so everything here is about containing it:
//!
//! * availability is probed **once** at service construction; an absent or
//!   unresponsive binary disables this strategy for the process lifetime
//!   without failing startup;
//! * every job gets a private scratch directory under the storage root, so
//!   concurrent conversions cannot collide and the output rename stays on
//!   one filesystem;
//! * the [`crate::janitor`] runs before each job to clear lock markers and
//!   scratch directories abandoned by earlier, abnormally terminated runs;
//! * the subprocess wait is bounded by a deadline, with `kill_on_drop` as
//!   the backstop so the process is terminated on every exit path,
//!   including an abandoned future;
//! * combined stdout+stderr is captured for diagnostics regardless of
//!   outcome and attached to every failure variant.

use crate::error::DocpressError;
use crate::janitor;
use crate::registry::Converter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Export filter passed to `--convert-to`.
const EXPORT_FILTER: &str = "pdf:writer_pdf_Export";

/// How long to keep reading captured output after the child has been
/// reaped. Engine helper processes can inherit the pipes and outlive the
/// parent; without a bound a killed job could block on them indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(5);

/// Media types routed to the engine.
const ENGINE_MEDIA_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/msword",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/x-ole-storage",
    "application/rtf",
    "text/html",
    "application/vnd.oasis.opendocument.text",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.presentation",
];

/// Filename extensions accepted as a secondary hint when content sniffing
/// was inconclusive.
const ENGINE_EXTENSIONS: &[&str] = &[
    ".doc", ".docx", ".xls", ".xlsx", ".xlsm", ".xlsb", ".ppt", ".pptx", ".odt", ".ods", ".odp",
    ".rtf", ".html", ".htm",
];

/// Conversion strategy backed by the external headless engine.
pub struct EngineConverter {
    binary: PathBuf,
    storage_dir: PathBuf,
    job_timeout: Duration,
    stale_scratch_after: Duration,
}

impl EngineConverter {
    pub fn new(
        binary: impl Into<PathBuf>,
        storage_dir: impl Into<PathBuf>,
        job_timeout: Duration,
        stale_scratch_after: Duration,
    ) -> Self {
        Self {
            binary: binary.into(),
            storage_dir: storage_dir.into(),
            job_timeout,
            stale_scratch_after,
        }
    }

    /// One-shot availability probe: spawn `<binary> --version` headlessly
    /// and require a clean exit within `deadline`.
    pub async fn probe(binary: &Path, deadline: Duration) -> Result<(), DocpressError> {
        let unavailable = || DocpressError::EngineUnavailable {
            path: binary.to_path_buf(),
        };

        let mut child = Command::new(binary)
            .arg("--version")
            .env("SAL_HEADLESS", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|_| unavailable())?;

        match tokio::time::timeout(deadline, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(_) => Err(unavailable()),
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(unavailable())
            }
        }
    }

    async fn run_job(&self, source: &Path, dest: &Path) -> Result<(), DocpressError> {
        // Clear anything a previous abnormal termination left behind.
        janitor::clean(&self.storage_dir, self.stale_scratch_after).await;

        let scratch = tempfile::Builder::new()
            .prefix(janitor::SCRATCH_PREFIX)
            .tempdir_in(&self.storage_dir)
            .map_err(|e| DocpressError::storage(&self.storage_dir, e))?;

        debug!(
            engine = %self.binary.display(),
            outdir = %scratch.path().display(),
            source = %source.display(),
            "invoking external engine"
        );

        let mut child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg(EXPORT_FILTER)
            .arg("--outdir")
            .arg(scratch.path())
            .arg(source)
            .env("SAL_NO_DIALOGS", "1")
            .env("SAL_HEADLESS", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|_| DocpressError::EngineUnavailable {
                path: self.binary.clone(),
            })?;

        let out_task = spawn_drain(child.stdout.take());
        let err_task = spawn_drain(child.stderr.take());

        let status = match tokio::time::timeout(self.job_timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                let output = collect_output(out_task, err_task).await;
                warn!(error = %e, "waiting on engine process failed");
                return Err(DocpressError::EngineFailed {
                    code: None,
                    output,
                });
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                None
            }
        };

        let output = collect_output(out_task, err_task).await;

        let Some(status) = status else {
            warn!(source = %source.display(), "engine conversion timed out, process killed");
            return Err(DocpressError::EngineTimeout {
                secs: self.job_timeout.as_secs(),
                output,
            });
        };

        if !status.success() {
            return Err(DocpressError::EngineFailed {
                code: status.code(),
                output,
            });
        }

        // The engine names its output after the source basename with the
        // extension replaced by `.pdf`.
        let mut produced_name = source.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        produced_name.push(".pdf");
        let produced = scratch.path().join(&produced_name);

        if !produced.is_file() {
            return Err(DocpressError::MissingEngineOutput {
                expected: produced,
                output,
            });
        }

        tokio::fs::rename(&produced, dest)
            .await
            .map_err(|e| DocpressError::storage(dest, e))?;
        debug!(dest = %dest.display(), output = %output, "engine conversion complete");

        // Conversion already succeeded; scratch cleanup is best-effort.
        if let Err(e) = scratch.close() {
            warn!(error = %e, "scratch directory cleanup failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for EngineConverter {
    fn name(&self) -> &'static str {
        "engine"
    }

    fn supports(&self, media_type: &str, filename: &str) -> bool {
        if ENGINE_MEDIA_TYPES.contains(&media_type) {
            return true;
        }
        let lower = filename.to_ascii_lowercase();
        ENGINE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    async fn convert(&self, source: &Path, dest: &Path) -> Result<(), DocpressError> {
        self.run_job(source, dest).await
    }
}

/// Read a captured pipe to the end on its own task. The reader is optional
/// so a missing pipe degrades to empty output instead of a panic.
fn spawn_drain<R>(reader: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut r) = reader {
            let _ = r.read_to_end(&mut buf).await;
        }
        buf
    })
}

/// Join the two capture tasks into one combined diagnostic string, bounded
/// by [`OUTPUT_GRACE`].
async fn collect_output(out: JoinHandle<Vec<u8>>, err: JoinHandle<Vec<u8>>) -> String {
    let combined = async move {
        let mut text = String::from_utf8_lossy(&out.await.unwrap_or_default()).into_owned();
        let err_bytes = err.await.unwrap_or_default();
        if !err_bytes.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&err_bytes));
        }
        text
    };
    tokio::time::timeout(OUTPUT_GRACE, combined)
        .await
        .unwrap_or_else(|_| String::from("<output unavailable>"))
}
