//! Conversion orchestration: the entry points a request-handling layer
//! consumes.
//!
//! ## Request flow
//!
//! ```text
//! bytes + declared filename
//!  │
//!  ├─ 1. Store    original persisted as {id}-orig.{ext}
//!  ├─ 2. Detect   media type from content, never from the claim
//!  ├─ 3. Dispatch already PDF → byte copy
//!  │               else → first matching registry strategy
//!  │               (in-process renderer or external engine job)
//!  └─ 4. Artifact id + metadata returned; {id}.pdf now exists
//! ```
//!
//! Every request runs independently; safety over the shared storage root
//! comes from unique ids (disjoint artifact paths), private engine scratch
//! directories, and rename-into-place for the final PDF, never locks. There
//! is no mid-flight cancellation; the engine deadline is the only
//! cancellation primitive, and no failure is retried within a request.

use crate::artifact::{Artifact, ConversionAttempt};
use crate::config::ServiceConfig;
use crate::detect;
use crate::engine::EngineConverter;
use crate::error::DocpressError;
use crate::registry::{Converter, ConverterRegistry};
use crate::render::image::ImageConverter;
use crate::render::text::TextConverter;
use crate::store::ArtifactStore;
use crate::sweeper::RetentionSweeper;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Document conversion service: store, convert, look up.
///
/// Construction is async because it creates the storage directory and, if
/// the engine is enabled, runs the one-shot availability probe. Cheap to
/// share via `Arc` across request handlers.
///
/// # Example
/// ```rust,no_run
/// use docpress::{ConvertService, ServiceConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let service = ConvertService::new(ServiceConfig::default()).await?;
/// let artifact = service.store_and_convert(b"hello\n", "hello.txt").await?;
/// println!("stored as {}", artifact.id);
/// assert!(service.pdf_path_for(&artifact.id).is_some());
/// # Ok(())
/// # }
/// ```
pub struct ConvertService {
    config: ServiceConfig,
    store: ArtifactStore,
    registry: ConverterRegistry,
}

impl ConvertService {
    /// Build the service: create the storage root, assemble the strategy
    /// registry, probe the engine once if enabled.
    ///
    /// An unavailable engine never fails construction: it is logged and
    /// the engine strategy is simply not registered, so office formats
    /// resolve to [`DocpressError::UnsupportedFormat`] for this process.
    pub async fn new(config: ServiceConfig) -> Result<Self, DocpressError> {
        tokio::fs::create_dir_all(&config.storage_dir)
            .await
            .map_err(|e| DocpressError::storage(&config.storage_dir, e))?;

        let mut converters: Vec<Arc<dyn Converter>> =
            vec![Arc::new(TextConverter), Arc::new(ImageConverter)];

        if config.engine_enabled {
            match EngineConverter::probe(&config.engine_path, config.probe_timeout).await {
                Ok(()) => {
                    info!(engine = %config.engine_path.display(), "external engine available");
                    converters.push(Arc::new(EngineConverter::new(
                        &config.engine_path,
                        &config.storage_dir,
                        config.engine_timeout,
                        config.stale_scratch_after,
                    )));
                }
                Err(e) => {
                    warn!(
                        engine = %config.engine_path.display(),
                        error = %e,
                        "external engine enabled but unavailable; office formats will be rejected"
                    );
                }
            }
        }

        let registry = ConverterRegistry::new(converters);
        info!(strategies = ?registry.strategy_names(), "conversion service ready");

        Ok(Self {
            store: ArtifactStore::new(&config.storage_dir),
            config,
            registry,
        })
    }

    /// Store the uploaded bytes and produce the PDF rendering.
    ///
    /// On failure the original stays stored (the sweeper will eventually
    /// collect it) and nothing is ever visible at the artifact's PDF path.
    pub async fn store_and_convert(
        &self,
        bytes: &[u8],
        declared_filename: &str,
    ) -> Result<Artifact, DocpressError> {
        let stored = self.store.put(bytes, declared_filename).await?;
        let media_type = detect::detect(bytes);
        let pdf_path = self.store.pdf_path(&stored.id);

        if media_type == detect::PDF {
            info!(id = %stored.id, file = %declared_filename, "already PDF, copying through");
            copy_atomic(&stored.path, &pdf_path).await?;
        } else {
            let converter = self
                .registry
                .resolve(media_type, declared_filename)
                .ok_or_else(|| DocpressError::UnsupportedFormat {
                    media_type: media_type.to_string(),
                    filename: declared_filename.to_string(),
                })?;
            let outcome = converter.convert(&stored.path, &pdf_path).await;
            ConversionAttempt::new(converter.name(), outcome).log(declared_filename)?;
        }

        Ok(Artifact {
            id: stored.id,
            original_filename: declared_filename.to_string(),
            media_type: media_type.to_string(),
            original_path: stored.path,
            pdf_path,
        })
    }

    /// Path of the converted PDF for `id`, if conversion has completed.
    pub fn pdf_path_for(&self, id: &str) -> Option<PathBuf> {
        self.store.pdf_path_for(id)
    }

    /// Path of the stored original for `id`, if present.
    pub fn original_path_for(&self, id: &str) -> Option<PathBuf> {
        self.store.original_path_for(id)
    }

    /// Start the background retention sweeper for this service's storage
    /// root, on the configured period. The handle can be dropped; the task
    /// keeps running until the runtime shuts down.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        RetentionSweeper::new(self.config.storage_dir.clone(), self.config.retention)
            .spawn(self.config.sweep_interval)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Byte-copy `source` to `dest` without a partial file ever being visible
/// at `dest`: copy into a sibling temp path, then rename.
async fn copy_atomic(source: &Path, dest: &Path) -> Result<(), DocpressError> {
    let tmp = dest.with_extension("pdf.tmp");
    if let Err(e) = tokio::fs::copy(source, &tmp).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(DocpressError::storage(source, e));
    }
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| DocpressError::storage(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service(dir: &Path) -> ConvertService {
        let config = ServiceConfig::builder()
            .storage_dir(dir)
            .build()
            .unwrap();
        ConvertService::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn unsupported_format_leaves_no_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;

        let err = svc
            .store_and_convert(&[0x00, 0x01, 0xFE, 0xFF], "mystery.bin")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported-format");

        let pdfs: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".pdf"))
            .collect();
        assert!(pdfs.is_empty());
    }

    #[tokio::test]
    async fn office_rejected_when_engine_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path()).await;

        // OOXML magic, which only the engine strategy accepts
        let mut docx = b"PK\x03\x04".to_vec();
        docx.extend_from_slice(b"word/document.xml");
        let err = svc
            .store_and_convert(&docx, "report.docx")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported-format");
    }

    #[tokio::test]
    async fn unavailable_engine_does_not_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig::builder()
            .storage_dir(dir.path())
            .engine_enabled(true)
            .engine_path("/nonexistent/soffice")
            .build()
            .unwrap();
        let svc = ConvertService::new(config).await.unwrap();

        // engine strategy absent, office input rejected rather than crashing
        let mut docx = b"PK\x03\x04".to_vec();
        docx.extend_from_slice(b"word/x");
        let err = svc.store_and_convert(&docx, "a.docx").await.unwrap_err();
        assert_eq!(err.kind(), "unsupported-format");
    }
}
