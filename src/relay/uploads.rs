//! Upload directory for fetched image content

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::{Error, Result};

/// Extension given to every stored image, whatever its encoding
pub const IMAGE_EXTENSION: &str = "jpg";

/// Name prefix of in-progress uploads
const STAGING_PREFIX: &str = ".line-relay-";

/// Whether `name` is a stored image or a staging file written by this store
fn is_owned_name(name: &str) -> bool {
    if name.starts_with(STAGING_PREFIX) {
        return true;
    }

    let path = Path::new(name);
    path.extension().is_some_and(|ext| ext == IMAGE_EXTENSION)
        && path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| uuid::Uuid::parse_str(stem).is_ok())
}

/// Directory holding uploaded images until they are consumed
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Open the store, creating the directory if it is missing
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Upload(format!("failed to create {}: {e}", dir.display()))
        })?;
        tracing::debug!(path = %dir.display(), "upload directory ready");
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new uniquely named file and return its path
    ///
    /// Content is staged in a temp file inside the directory and renamed into
    /// place, so a half-written upload never carries the final name.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub async fn save(&self, bytes: Vec<u8>) -> Result<PathBuf> {
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let mut staged = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(&dir)?;
            staged.write_all(&bytes)?;
            staged.flush()?;

            let path = dir.join(format!("{}.{IMAGE_EXTENSION}", uuid::Uuid::new_v4()));
            staged
                .persist(&path)
                .map_err(|e| Error::Upload(format!("failed to store upload: {}", e.error)))?;
            Ok(path)
        })
        .await
        .map_err(|e| Error::Upload(format!("upload task failed: {e}")))?
    }

    /// Delete a stored file, returning whether it was removed
    ///
    /// Failures are logged, not returned.
    pub async fn remove(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed upload");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove upload");
                false
            }
        }
    }

    /// Delete stored and staging files last modified more than `ttl` ago
    ///
    /// Files this store did not write are never touched, so the directory
    /// can be shared with other content.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be listed
    pub async fn sweep(&self, ttl: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() || !entry.file_name().to_str().is_some_and(is_owned_name) {
                continue;
            }

            let age = meta
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if age.is_some_and(|age| age > ttl) && self.remove(&entry.path()).await {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("static");

        let store = UploadStore::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.dir(), dir);
    }

    #[tokio::test]
    async fn save_writes_unique_jpg_files() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();

        let a = store.save(b"first".to_vec()).await.unwrap();
        let b = store.save(b"second".to_vec()).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(a.parent(), Some(root.path()));
        assert_eq!(std::fs::read(&a).unwrap(), b"first");
        assert_eq!(std::fs::read(&b).unwrap(), b"second");
        // no staging files left behind
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn remove_ignores_missing_files() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();
        let path = store.save(b"x".to_vec()).await.unwrap();

        assert!(store.remove(&path).await);
        assert!(!store.remove(&path).await);
        assert!(!path.exists());
    }

    #[test]
    fn owned_names_are_uuid_jpgs_and_staging_files() {
        assert!(is_owned_name("67e55044-10b1-426f-9247-bb680e5fe0c8.jpg"));
        assert!(is_owned_name(".line-relay-AbC123"));
        assert!(!is_owned_name("index.html"));
        assert!(!is_owned_name("logo.jpg"));
        assert!(!is_owned_name("67e55044-10b1-426f-9247-bb680e5fe0c8.png"));
    }

    #[tokio::test]
    async fn sweep_leaves_foreign_files_alone() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();
        let upload = store.save(b"x".to_vec()).await.unwrap();
        let foreign = root.path().join("index.html");
        std::fs::write(&foreign, b"<html></html>").unwrap();
        let logo = root.path().join("logo.jpg");
        std::fs::write(&logo, b"logo").unwrap();
        let stale_staging = root.path().join(".line-relay-leftover");
        std::fs::write(&stale_staging, b"partial").unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep(Duration::from_millis(1)).await.unwrap(), 2);

        assert!(!upload.exists());
        assert!(!stale_staging.exists());
        assert!(foreign.exists());
        assert!(logo.exists());
    }

    #[tokio::test]
    async fn sweep_keeps_fresh_files() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();
        let path = store.save(b"x".to_vec()).await.unwrap();

        assert_eq!(store.sweep(Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(path.exists());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep(Duration::from_millis(1)).await.unwrap(), 1);
        assert!(!path.exists());
    }
}
