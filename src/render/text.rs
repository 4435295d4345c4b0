//! Plain-text to PDF rendering.
//!
//! Layout is deliberately simple: Helvetica 12 pt on US-Letter pages, a
//! fixed 14 pt leading, and a naive wrap at 90 columns. The goal is a
//! faithful, readable rendition of logs, CSVs and notes, not typography.

use crate::error::DocpressError;
use crate::registry::Converter;
use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 14;
const WRAP_COLUMNS: usize = 90;

/// First baseline sits one leading below the top margin.
const TOP_Y: i64 = PAGE_HEIGHT - MARGIN;
const LINES_PER_PAGE: usize = ((TOP_Y - MARGIN) / LEADING) as usize;

/// Renders `text/*` documents (except HTML) to PDF.
pub struct TextConverter;

#[async_trait]
impl Converter for TextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn supports(&self, media_type: &str, filename: &str) -> bool {
        // HTML is text/* but needs a real layout engine; it belongs to the
        // external engine strategy.
        if media_type.starts_with("text/") && media_type != "text/html" {
            return true;
        }
        let lower = filename.to_ascii_lowercase();
        [".txt", ".csv", ".log", ".md"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }

    async fn convert(&self, source: &Path, dest: &Path) -> Result<(), DocpressError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let bytes =
                std::fs::read(&source).map_err(|e| DocpressError::storage(&source, e))?;
            let text = String::from_utf8_lossy(&bytes);
            let doc = build_pdf(&text)?;
            super::save_atomic(doc, &dest, "text")
        })
        .await
        .map_err(|e| DocpressError::ConversionFailed {
            strategy: "text",
            detail: format!("render task panicked: {e}"),
        })?
    }
}

/// Lay the text out into a paginated PDF document.
fn build_pdf(text: &str) -> Result<Document, DocpressError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut lines = wrap_lines(text);
    if lines.is_empty() {
        lines.push(Vec::new());
    }

    let mut kids: Vec<Object> = Vec::new();
    for page_lines in lines.chunks(LINES_PER_PAGE) {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new("Td", vec![MARGIN.into(), TOP_Y.into()]),
        ];
        for line in page_lines {
            if !line.is_empty() {
                ops.push(Operation::new("Tj", vec![Object::string_literal(line.clone())]));
            }
            ops.push(Operation::new("T*", vec![]));
        }
        ops.push(Operation::new("ET", vec![]));

        let content = Content { operations: ops };
        let encoded = content
            .encode()
            .map_err(|e| DocpressError::ConversionFailed {
                strategy: "text",
                detail: format!("content encode: {e}"),
            })?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Split input lines at [`WRAP_COLUMNS`] characters and encode each piece
/// for the page content stream.
fn wrap_lines(text: &str) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for raw in text.lines() {
        let line = raw.replace('\t', "    ");
        if line.is_empty() {
            out.push(Vec::new());
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(WRAP_COLUMNS) {
            out.push(encode_latin1(chunk));
        }
    }
    out
}

/// Type1 Helvetica strings are byte-encoded; anything outside Latin-1 is
/// replaced rather than corrupting the content stream.
fn encode_latin1(chars: &[char]) -> Vec<u8> {
    chars
        .iter()
        .map(|&c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_long_lines_at_ninety_columns() {
        let line = "x".repeat(200);
        let wrapped = wrap_lines(&line);
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped[0].len(), 90);
        assert_eq!(wrapped[2].len(), 20);
    }

    #[test]
    fn preserves_blank_lines() {
        let wrapped = wrap_lines("a\n\nb");
        assert_eq!(wrapped.len(), 3);
        assert!(wrapped[1].is_empty());
    }

    #[test]
    fn non_latin1_replaced() {
        assert_eq!(encode_latin1(&['a', '日', 'é']), vec![b'a', b'?', 0xE9]);
    }

    #[test]
    fn empty_input_still_yields_one_page() {
        let mut doc = build_pdf("").unwrap();
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        assert!(buf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn converts_text_file_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.txt");
        let dst = dir.path().join("notes.pdf");
        std::fs::write(&src, "hello docpress\nsecond line\n").unwrap();

        TextConverter.convert(&src, &dst).await.unwrap();

        let pdf = std::fs::read(&dst).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(pdf.len() > 0);
        // no temp residue
        assert!(!dir.path().join("notes.pdf.tmp").exists());
    }
}
