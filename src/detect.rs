//! Content-based format detection.
//!
//! Declared filenames lie: a `.doc` upload is routinely a zipped OOXML
//! document and vice versa, so the detector looks only at the bytes. The
//! filename extension is used as a secondary hint inside strategy matching
//! ([`crate::registry::Converter::supports`]), never as the primary type
//! source.
//!
//! `detect` is total: it never fails, and anything it cannot classify
//! (including empty input) comes back as `application/octet-stream`.

/// Canonical media type for unclassifiable input.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Canonical media type for PDF, the passthrough case.
pub const PDF: &str = "application/pdf";

/// OLE2 Compound File Binary signature, the container of legacy binary
/// office formats (.doc/.xls/.ppt).
const OLE2_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Best-guess canonical media type for the given bytes.
pub fn detect(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return OCTET_STREAM;
    }

    if bytes.starts_with(b"%PDF") {
        return PDF;
    }

    // Images
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return "image/gif";
    }
    // "BM" alone is too weak (any text can start with it); require the
    // header's reserved bytes to be zero as well.
    if bytes.starts_with(b"BM") && bytes.len() > 14 && bytes[6..10] == [0, 0, 0, 0] {
        return "image/bmp";
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return "image/webp";
    }

    // ZIP container: OOXML documents are zip archives whose entry names are
    // visible in the raw stream; scanning a bounded prefix for the
    // characteristic directory names classifies them without a zip parser.
    if bytes.starts_with(b"PK\x03\x04") {
        let window = &bytes[..bytes.len().min(64 * 1024)];
        if contains(window, b"word/") {
            return "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
        }
        if contains(window, b"xl/") {
            return "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
        }
        if contains(window, b"ppt/") {
            return "application/vnd.openxmlformats-officedocument.presentationml.presentation";
        }
        return "application/zip";
    }

    if bytes.starts_with(&OLE2_MAGIC) {
        return "application/x-ole-storage";
    }

    if bytes.starts_with(b"{\\rtf") {
        return "application/rtf";
    }

    // Text family: decide on a bounded prefix so a multi-gigabyte upload
    // does not get scanned end to end. A multi-byte character cut at the
    // window boundary must not disqualify real text.
    let prefix_len = bytes.len().min(4096);
    let prefix = match std::str::from_utf8(&bytes[..prefix_len]) {
        Ok(t) => Some(t),
        Err(e) if prefix_len < bytes.len() && e.valid_up_to() + 4 > prefix_len => {
            std::str::from_utf8(&bytes[..e.valid_up_to()]).ok()
        }
        Err(_) => None,
    };
    if let Some(text) = prefix {
        let trimmed = text.trim_start();
        let lower = trimmed
            .chars()
            .take(32)
            .collect::<String>()
            .to_ascii_lowercase();
        if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
            return "text/html";
        }
        if !text.contains('\0') {
            return "text/plain";
        }
    }

    OCTET_STREAM
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
