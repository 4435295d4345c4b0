//! # docpress
//!
//! Store uploaded documents of arbitrary, a-priori-unknown format and render
//! them to PDF, keyed by a stable opaque id.
//!
//! ## Why this crate?
//!
//! The hard part of a document-to-PDF service is not any single renderer.
//! It is the orchestration around an unreliable, slow, stateful external
//! office engine and a filesystem that doubles as the database. This crate
//! owns exactly that: content-based format detection, deterministic
//! strategy dispatch, subprocess lifecycle with hard deadlines and stale
//! state cleanup, atomic result placement, and age-based eviction, all
//! without a database or any cross-process coordinator.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes + filename
//!  │
//!  ├─ 1. Store     original saved as {id}-orig.{ext}
//!  ├─ 2. Detect    media type sniffed from content
//!  ├─ 3. Dispatch  PDF → passthrough copy
//!  │                text/* , image/* → in-process lopdf renderers
//!  │                office/HTML → headless engine subprocess (bounded wait,
//!  │                              private scratch dir, janitor pre-pass)
//!  └─ 4. Artifact  {id}.pdf moved into place atomically
//!
//! retention sweeper (independent, periodic) ──▶ deletes entries older
//!                                               than the retention window
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docpress::{ConvertService, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .storage_dir("storage")
//!         .engine_enabled(true)
//!         .build()?;
//!     let service = ConvertService::new(config).await?;
//!     let _sweeper = service.spawn_sweeper();
//!
//!     let bytes = std::fs::read("report.docx")?;
//!     let artifact = service.store_and_convert(&bytes, "report.docx").await?;
//!     println!("pdf at: {}", artifact.pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docpress = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod janitor;
pub mod registry;
pub mod render;
pub mod service;
pub mod store;
pub mod sweeper;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{Artifact, ConversionAttempt};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::DocpressError;
pub use registry::{Converter, ConverterRegistry};
pub use service::ConvertService;
pub use sweeper::RetentionSweeper;
