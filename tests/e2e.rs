//! End-to-end integration tests for docpress.
//!
//! Everything here runs against a throwaway storage root with the external
//! engine disabled, except the engine tests at the bottom, which probe for
//! a real `soffice` binary and skip themselves when it is not installed.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use docpress::engine::EngineConverter;
use docpress::{ConvertService, DocpressError, RetentionSweeper, ServiceConfig};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

async fn service(dir: &Path) -> ConvertService {
    let config = ServiceConfig::builder()
        .storage_dir(dir)
        .build()
        .expect("valid config");
    ConvertService::new(config).await.expect("service init")
}

/// A minimal but structurally complete PDF, for passthrough tests.
const TINY_PDF: &[u8] = b"%PDF-1.4\n1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n2 0 obj<</Type/Pages/Kids[]/Count 0>>endobj\ntrailer<</Root 1 0 R>>\n%%EOF\n";

/// Skip the test unless a working engine binary is installed.
macro_rules! engine_or_skip {
    () => {
        if EngineConverter::probe(Path::new("soffice"), Duration::from_secs(5))
            .await
            .is_err()
        {
            println!("SKIP — external engine (soffice) not installed");
            return;
        }
    };
}

fn pdf_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".pdf"))
        .collect()
}

// ── Conversion round trips ───────────────────────────────────────────────────

#[tokio::test]
async fn text_upload_yields_pdf_and_intact_original() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;
    let content = b"Quarterly report\n\nRevenue is up.\n";

    let artifact = svc.store_and_convert(content, "report.txt").await.unwrap();

    assert_eq!(artifact.media_type, "text/plain");

    let pdf_path = svc.pdf_path_for(&artifact.id).expect("pdf present");
    let pdf = std::fs::read(&pdf_path).unwrap();
    assert!(pdf.len() > 0);
    assert!(pdf.starts_with(b"%PDF"));

    let original_path = svc.original_path_for(&artifact.id).expect("original present");
    assert_eq!(std::fs::read(&original_path).unwrap(), content);
}

#[tokio::test]
async fn pdf_passthrough_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;

    let artifact = svc.store_and_convert(TINY_PDF, "existing.pdf").await.unwrap();

    assert_eq!(artifact.media_type, "application/pdf");
    let stored = std::fs::read(svc.pdf_path_for(&artifact.id).unwrap()).unwrap();
    assert_eq!(stored, TINY_PDF);
}

#[tokio::test]
async fn image_upload_yields_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;

    let mut png = Vec::new();
    image::RgbImage::from_pixel(8, 8, image::Rgb([10, 200, 10]))
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    // declared filename lies on purpose; content sniffing must win
    let artifact = svc.store_and_convert(&png, "scan.dat").await.unwrap();
    assert_eq!(artifact.media_type, "image/png");

    let pdf = std::fs::read(svc.pdf_path_for(&artifact.id).unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn unsupported_binary_fails_with_no_pdf_entry() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;

    let err = svc
        .store_and_convert(&[0x00, 0x10, 0xFE, 0xCA, 0xFE], "firmware.bin")
        .await
        .unwrap_err();

    match err {
        DocpressError::UnsupportedFormat { media_type, filename } => {
            assert_eq!(media_type, "application/octet-stream");
            assert_eq!(filename, "firmware.bin");
        }
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
    assert!(pdf_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn lookups_are_absent_until_conversion_completes() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;

    assert!(svc.pdf_path_for("0b7e4a9c-no-such-id").is_none());
    assert!(svc.original_path_for("0b7e4a9c-no-such-id").is_none());

    let artifact = svc.store_and_convert(b"hello\n", "hello.txt").await.unwrap();
    assert!(svc.pdf_path_for(&artifact.id).is_some());

    // never a temp file left at or beside the final path
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.ends_with(".tmp")), "names: {names:?}");
}

#[tokio::test]
async fn concurrent_uploads_get_disjoint_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let svc = Arc::new(service(dir.path()).await);

    let mut handles = Vec::new();
    for i in 0..8 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            let body = format!("document number {i}\n");
            svc.store_and_convert(body.as_bytes(), "doc.txt").await
        }));
    }

    let mut ids = std::collections::HashSet::new();
    for handle in handles {
        let artifact = handle.await.unwrap().unwrap();
        assert!(svc.pdf_path_for(&artifact.id).is_some());
        assert!(ids.insert(artifact.id), "duplicate artifact id");
    }
    assert_eq!(ids.len(), 8);
}

// ── Retention ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweeper_removes_expired_artifacts_only() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(dir.path()).await;

    let artifact = svc.store_and_convert(b"old\n", "old.txt").await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // a day-long window keeps everything
    assert_eq!(
        RetentionSweeper::new(dir.path(), Duration::from_secs(24 * 3600))
            .run_once()
            .await,
        0
    );
    assert!(svc.pdf_path_for(&artifact.id).is_some());

    // a zero window removes both the original and the pdf
    assert_eq!(
        RetentionSweeper::new(dir.path(), Duration::ZERO).run_once().await,
        2
    );
    assert!(svc.pdf_path_for(&artifact.id).is_none());
    assert!(svc.original_path_for(&artifact.id).is_none());
}

// ── External engine (requires soffice, skipped otherwise) ────────────────────

#[tokio::test]
async fn engine_converts_html_end_to_end() {
    engine_or_skip!();

    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::builder()
        .storage_dir(dir.path())
        .engine_enabled(true)
        .build()
        .unwrap();
    let svc = ConvertService::new(config).await.unwrap();

    let html = b"<html><body><h1>Invoice</h1><p>Total: 42</p></body></html>";
    let artifact = svc.store_and_convert(html, "invoice.html").await.unwrap();

    assert_eq!(artifact.media_type, "text/html");
    let pdf = std::fs::read(svc.pdf_path_for(&artifact.id).unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF"));

    // the job's scratch directory is gone
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("libreconv-"))
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
}

#[tokio::test]
async fn engine_rejects_garbage_office_file() {
    engine_or_skip!();

    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::builder()
        .storage_dir(dir.path())
        .engine_enabled(true)
        .build()
        .unwrap();
    let svc = ConvertService::new(config).await.unwrap();

    // OLE2 magic followed by garbage: routed to the engine, which fails
    let mut junk = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    junk.extend_from_slice(&[0u8; 64]);

    let err = svc.store_and_convert(&junk, "corrupt.doc").await.unwrap_err();
    let kind = err.kind();
    assert!(
        matches!(kind, "engine-failed" | "missing-engine-output" | "engine-timeout"),
        "unexpected kind: {kind}"
    );
    assert!(pdf_entries(dir.path()).is_empty());
}
