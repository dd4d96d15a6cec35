//! Preview store
//!
//! Persistence for rendered page images and their fingerprint sidecars.
//! Layout under the configured root:
//!
//! ```text
//! {root}/doc/{id}/img.{page}.jpg
//! {root}/doc/{id}/img.{page}.jpg.sha1
//! ```
//!
//! Paths only ever depend on the numeric doc id and page number, so no
//! request-supplied string reaches the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Storage backend for rendered previews.
///
/// Keyed by doc id and 1-based page number. Absent entries read as `None`
/// rather than errors so callers can fall through to a 404 or a re-render.
#[async_trait::async_trait]
pub trait PreviewStore: Send + Sync {
    /// Create the root directory if it does not exist yet.
    async fn ensure_root(&self) -> io::Result<()>;

    /// Remove every stored page and sidecar for a doc.
    ///
    /// Missing directories are fine; a doc that never had previews
    /// invalidates to the same state as one that did.
    async fn invalidate(&self, doc_id: i64) -> io::Result<()>;

    /// Create an empty directory ready to receive pages for a doc.
    async fn prepare(&self, doc_id: i64) -> io::Result<()>;

    /// Stable storage key for a page image, relative to the root.
    fn page_key(&self, doc_id: i64, page: u32) -> String;

    /// Read a stored page image, or `None` if it was never written.
    async fn read_page(&self, doc_id: i64, page: u32) -> io::Result<Option<Vec<u8>>>;

    /// Write a page image, replacing any previous bytes.
    async fn write_page(&self, doc_id: i64, page: u32, data: &[u8]) -> io::Result<()>;

    /// Read the fingerprint sidecar for a page, trimmed of whitespace.
    async fn read_fingerprint(&self, doc_id: i64, page: u32) -> io::Result<Option<String>>;

    /// Write the fingerprint sidecar unless one already exists.
    ///
    /// Returns `true` when this call created the sidecar. Creation is
    /// atomic, so concurrent writers race safely and the first one wins.
    async fn write_fingerprint_if_missing(
        &self,
        doc_id: i64,
        page: u32,
        fingerprint: &str,
    ) -> io::Result<bool>;

    /// List the page numbers currently stored for a doc, ascending.
    async fn list_pages(&self, doc_id: i64) -> io::Result<Vec<u32>>;
}

/// Local-disk implementation of [`PreviewStore`].
pub struct FilesystemPreviewStore {
    root: PathBuf,
}

impl FilesystemPreviewStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_dir(&self, doc_id: i64) -> PathBuf {
        self.root.join("doc").join(doc_id.to_string())
    }

    fn page_file(&self, doc_id: i64, page: u32) -> PathBuf {
        self.doc_dir(doc_id).join(format!("img.{}.jpg", page))
    }

    fn fingerprint_file(&self, doc_id: i64, page: u32) -> PathBuf {
        self.doc_dir(doc_id).join(format!("img.{}.jpg.sha1", page))
    }
}

#[async_trait::async_trait]
impl PreviewStore for FilesystemPreviewStore {
    async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    async fn invalidate(&self, doc_id: i64) -> io::Result<()> {
        // remove_dir_all deletes a symlink itself rather than following it,
        // so a planted link cannot redirect the delete outside the root.
        match tokio::fs::remove_dir_all(self.doc_dir(doc_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn prepare(&self, doc_id: i64) -> io::Result<()> {
        tokio::fs::create_dir_all(self.doc_dir(doc_id)).await
    }

    fn page_key(&self, doc_id: i64, page: u32) -> String {
        format!("doc/{}/img.{}.jpg", doc_id, page)
    }

    async fn read_page(&self, doc_id: i64, page: u32) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.page_file(doc_id, page)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_page(&self, doc_id: i64, page: u32, data: &[u8]) -> io::Result<()> {
        tokio::fs::write(self.page_file(doc_id, page), data).await
    }

    async fn read_fingerprint(&self, doc_id: i64, page: u32) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.fingerprint_file(doc_id, page)).await {
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_fingerprint_if_missing(
        &self,
        doc_id: i64,
        page: u32,
        fingerprint: &str,
    ) -> io::Result<bool> {
        let path = self.fingerprint_file(doc_id, page);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };

        file.write_all(fingerprint.as_bytes()).await?;
        Ok(true)
    }

    async fn list_pages(&self, doc_id: i64) -> io::Result<Vec<u32>> {
        let mut entries = match tokio::fs::read_dir(self.doc_dir(doc_id)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut pages = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(page) = parse_page_number(&name.to_string_lossy()) {
                pages.push(page);
            }
        }

        pages.sort_unstable();
        Ok(pages)
    }
}

/// Extract the page number from an `img.{page}.jpg` file name.
///
/// Sidecars (`.jpg.sha1`) and anything else do not match.
fn parse_page_number(name: &str) -> Option<u32> {
    name.strip_prefix("img.")?
        .strip_suffix(".jpg")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FilesystemPreviewStore) {
        let dir = TempDir::new().unwrap();
        let store = FilesystemPreviewStore::new(dir.path().join("previews"));
        (dir, store)
    }

    #[tokio::test]
    async fn ensure_root_is_idempotent() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.ensure_root().await.unwrap();
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn invalidate_tolerates_missing_doc() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.invalidate(42).await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_then_prepare_yields_empty_dir() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.prepare(7).await.unwrap();
        store.write_page(7, 1, b"jpeg bytes").await.unwrap();
        store
            .write_fingerprint_if_missing(7, 1, "abc")
            .await
            .unwrap();

        store.invalidate(7).await.unwrap();
        store.prepare(7).await.unwrap();

        assert_eq!(store.list_pages(7).await.unwrap(), Vec::<u32>::new());
        assert_eq!(store.read_page(7, 1).await.unwrap(), None);
        assert_eq!(store.read_fingerprint(7, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn page_roundtrip_and_absence() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.prepare(3).await.unwrap();

        assert_eq!(store.read_page(3, 1).await.unwrap(), None);

        store.write_page(3, 1, b"page one").await.unwrap();
        assert_eq!(
            store.read_page(3, 1).await.unwrap(),
            Some(b"page one".to_vec())
        );
    }

    #[tokio::test]
    async fn fingerprint_first_writer_wins() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.prepare(5).await.unwrap();

        assert!(store
            .write_fingerprint_if_missing(5, 2, "first")
            .await
            .unwrap());
        assert!(!store
            .write_fingerprint_if_missing(5, 2, "second")
            .await
            .unwrap());
        assert_eq!(
            store.read_fingerprint(5, 2).await.unwrap(),
            Some("first".to_string())
        );
    }

    #[tokio::test]
    async fn fingerprint_read_trims_whitespace() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.prepare(5).await.unwrap();
        tokio::fs::write(store.fingerprint_file(5, 1), "abc123\n")
            .await
            .unwrap();

        assert_eq!(
            store.read_fingerprint(5, 1).await.unwrap(),
            Some("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn list_pages_skips_sidecars_and_sorts() {
        let (_dir, store) = store();
        store.ensure_root().await.unwrap();
        store.prepare(9).await.unwrap();
        store.write_page(9, 10, b"ten").await.unwrap();
        store.write_page(9, 2, b"two").await.unwrap();
        store.write_page(9, 1, b"one").await.unwrap();
        store
            .write_fingerprint_if_missing(9, 1, "fp")
            .await
            .unwrap();

        assert_eq!(store.list_pages(9).await.unwrap(), vec![1, 2, 10]);
        assert_eq!(store.list_pages(8).await.unwrap(), Vec::<u32>::new());
    }

    #[tokio::test]
    async fn page_key_is_stable() {
        let (_dir, store) = store();
        assert_eq!(store.page_key(12, 3), "doc/12/img.3.jpg");
        assert_eq!(store.page_key(12, 3), store.page_key(12, 3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalidate_does_not_follow_symlinks() {
        let (dir, store) = store();
        store.ensure_root().await.unwrap();

        let outside = dir.path().join("outside");
        tokio::fs::create_dir_all(&outside).await.unwrap();
        tokio::fs::write(outside.join("keep.txt"), b"survives")
            .await
            .unwrap();

        tokio::fs::create_dir_all(store.root().join("doc"))
            .await
            .unwrap();
        tokio::fs::symlink(&outside, store.root().join("doc").join("66"))
            .await
            .unwrap();

        store.invalidate(66).await.unwrap();

        assert!(outside.join("keep.txt").exists());
        assert!(!store.root().join("doc").join("66").exists());
    }
}
