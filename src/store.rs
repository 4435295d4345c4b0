//! Filesystem-backed artifact store.
//!
//! There is deliberately no in-memory index: a path derived from the id by
//! a fixed suffix convention either exists or it does not, which makes the
//! store trivially consistent across process restarts and between
//! concurrent requests. The id-derived path convention is the *only*
//! synchronization mechanism over the shared storage root.
//!
//! Layout, directly under the storage root:
//!
//! ```text
//! {id}-orig.{ext}   stored original ("-orig" alone when the declared
//!                   filename had no usable extension)
//! {id}.pdf          converted PDF — exists iff conversion completed
//! ```

use crate::error::DocpressError;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A stored original, before conversion.
#[derive(Debug)]
pub struct StoredOriginal {
    pub id: String,
    pub path: PathBuf,
}

/// Mapping from opaque ids to original and converted files.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the original bytes under a fresh id.
    ///
    /// The declared filename contributes only its extension, sanitized to
    /// ASCII alphanumerics; everything else about the path comes from the
    /// generated id.
    pub async fn put(
        &self,
        bytes: &[u8],
        declared_filename: &str,
    ) -> Result<StoredOriginal, DocpressError> {
        let id = Uuid::new_v4().to_string();
        let name = match sanitized_extension(declared_filename) {
            Some(ext) => format!("{id}-orig.{ext}"),
            None => format!("{id}-orig"),
        };
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| DocpressError::storage(&path, e))?;
        debug!(id = %id, bytes = bytes.len(), "stored original");
        Ok(StoredOriginal { id, path })
    }

    /// Convention path of the PDF for `id`, whether or not it exists yet.
    pub fn pdf_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.pdf"))
    }

    /// Path of the converted PDF, or `None` if conversion has not
    /// completed for this id.
    pub fn pdf_path_for(&self, id: &str) -> Option<PathBuf> {
        if !valid_id(id) {
            return None;
        }
        let path = self.pdf_path(id);
        path.is_file().then_some(path)
    }

    /// Path of the stored original, or `None`. The original's extension is
    /// unknown at lookup time, so this prefix-matches `{id}-orig`.
    pub fn original_path_for(&self, id: &str) -> Option<PathBuf> {
        if !valid_id(id) {
            return None;
        }
        let prefix = format!("{id}-orig");
        std::fs::read_dir(&self.dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .find(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
            })
    }
}

/// Ids are generated by this crate and never contain path separators; a
/// caller-supplied id that does is not a lookup miss but an attempt to
/// escape the storage root, and always resolves to nothing.
fn valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(['/', '\\']) && !id.contains("..")
}

/// Extension of the declared filename, lowercased, if it is purely ASCII
/// alphanumeric and reasonably short.
fn sanitized_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn put_uses_suffix_convention() {
        let (_dir, store) = store();
        let stored = store.put(b"hello", "Notes.TXT").await.unwrap();
        assert!(stored
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("-orig.txt"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn extensionless_filename_gets_no_suffix() {
        let (_dir, store) = store();
        let stored = store.put(b"data", "README").await.unwrap();
        assert!(stored
            .path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("-orig"));
    }

    #[tokio::test]
    async fn ids_are_unique_and_path_safe() {
        let (_dir, store) = store();
        let a = store.put(b"a", "a.txt").await.unwrap();
        let b = store.put(b"b", "b.txt").await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(!a.id.contains('/'));
        assert!(!a.id.contains('\\'));
    }

    #[tokio::test]
    async fn original_lookup_prefix_matches_unknown_extension() {
        let (_dir, store) = store();
        let stored = store.put(b"x", "report.docx").await.unwrap();
        let found = store.original_path_for(&stored.id).unwrap();
        assert_eq!(found, stored.path);
    }

    #[tokio::test]
    async fn pdf_lookup_reflects_filesystem_presence() {
        let (_dir, store) = store();
        let stored = store.put(b"x", "a.txt").await.unwrap();
        assert!(store.pdf_path_for(&stored.id).is_none());

        std::fs::write(store.pdf_path(&stored.id), b"%PDF-1.4").unwrap();
        assert!(store.pdf_path_for(&stored.id).is_some());
    }

    #[test]
    fn traversal_ids_resolve_to_nothing() {
        let (_dir, store) = store();
        assert!(store.pdf_path_for("../etc/passwd").is_none());
        assert!(store.original_path_for("a/b").is_none());
        assert!(store.pdf_path_for("").is_none());
    }

    #[test]
    fn extension_sanitizing() {
        assert_eq!(sanitized_extension("a.TXT"), Some("txt".into()));
        assert_eq!(sanitized_extension("archive.tar.gz"), Some("gz".into()));
        assert_eq!(sanitized_extension("no_extension"), None);
        assert_eq!(sanitized_extension("weird.t%t"), None);
        assert_eq!(sanitized_extension("dots..."), None);
    }
}
