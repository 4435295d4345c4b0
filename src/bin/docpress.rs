//! CLI binary for docpress.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, feeds files through the conversion service and prints
//! the resulting artifact ids.

use anyhow::{bail, Context, Result};
use clap::Parser;
use docpress::{ConvertService, RetentionSweeper, ServiceConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "docpress",
    version,
    about = "Convert documents to PDF and manage the artifact store"
)]
struct Cli {
    /// Files to convert.
    inputs: Vec<PathBuf>,

    /// Storage root for originals and converted PDFs.
    #[arg(long, env = "DOCPRESS_STORAGE_DIR", default_value = "storage")]
    storage_dir: PathBuf,

    /// Retention window in days (used by --prune and the sweeper).
    #[arg(long, env = "DOCPRESS_RETENTION_DAYS", default_value_t = 30)]
    retention_days: u64,

    /// Enable the external office engine for office and HTML formats.
    #[arg(long, env = "DOCPRESS_ENGINE")]
    engine: bool,

    /// Path to the engine binary.
    #[arg(long, env = "DOCPRESS_ENGINE_PATH", default_value = "soffice")]
    engine_path: PathBuf,

    /// Deadline for a single engine conversion, in seconds.
    #[arg(long, default_value_t = 60)]
    engine_timeout_secs: u64,

    /// Print each artifact as JSON instead of the human-readable line.
    #[arg(long)]
    json: bool,

    /// Run one retention sweep over the storage root, then convert any
    /// inputs (or exit if none were given).
    #[arg(long)]
    prune: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.inputs.is_empty() && !cli.prune {
        bail!("nothing to do: pass input files, or --prune");
    }

    let config = ServiceConfig::builder()
        .storage_dir(&cli.storage_dir)
        .retention_days(cli.retention_days)
        .engine_enabled(cli.engine)
        .engine_path(&cli.engine_path)
        .engine_timeout(Duration::from_secs(cli.engine_timeout_secs))
        .build()
        .context("invalid configuration")?;

    if cli.prune {
        let deleted = RetentionSweeper::new(&cli.storage_dir, config.retention)
            .run_once()
            .await;
        println!(
            "{} removed {deleted} expired storage entries",
            green("✓")
        );
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    let service = ConvertService::new(config)
        .await
        .context("failed to initialise conversion service")?;

    let bar = (cli.inputs.len() > 1).then(|| {
        let bar = ProgressBar::new(cli.inputs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40.green/238}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    });

    let mut failed = 0usize;
    for input in &cli.inputs {
        let filename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        if let Some(bar) = &bar {
            bar.set_message(filename.clone());
        }

        let result = match std::fs::read(input) {
            Ok(bytes) => service.store_and_convert(&bytes, &filename).await,
            Err(e) => {
                report_failure(&bar, &filename, &format!("read failed: {e}"));
                failed += 1;
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
                continue;
            }
        };

        match result {
            Ok(artifact) => {
                let line = if cli.json {
                    serde_json::to_string(&artifact).context("artifact serialisation")?
                } else {
                    format!(
                        "{} {}  {}  {}",
                        green("✓"),
                        artifact.id,
                        filename,
                        dim(&artifact.pdf_path.display().to_string()),
                    )
                };
                match &bar {
                    Some(bar) => bar.println(line),
                    None => println!("{line}"),
                }
            }
            Err(e) => {
                report_failure(&bar, &filename, &e.to_string());
                failed += 1;
            }
        }
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    if failed > 0 {
        bail!("{failed}/{} conversions failed", cli.inputs.len());
    }
    Ok(())
}

fn report_failure(bar: &Option<ProgressBar>, filename: &str, detail: &str) {
    let line = format!("{} {}  {}", red("✗"), filename, detail);
    match bar {
        Some(bar) => bar.println(line),
        None => eprintln!("{line}"),
    }
}
