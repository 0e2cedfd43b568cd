//! File-backed staging directory for order documents.
//!
//! Generated workbooks and uploaded files are written here before they are
//! sent. Existing files are never overwritten: a colliding name is staged as
//! `stem-1.ext`, `stem-2.ext`, ... and finally with a UUID suffix.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::StorageError;

/// Numbered suffixes tried before falling back to a UUID.
const MAX_NUMBERED_SUFFIX: u32 = 99;

/// Upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at `base_path`. Call [`ensure_dir`](Self::ensure_dir)
    /// before staging.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Ensure the upload directory exists.
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Write `bytes` under (a sanitized form of) `file_name` and return the
    /// path actually written.
    pub async fn stage(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let name = sanitize_file_name(file_name)?;
        let (stem, ext) = split_extension(&name);

        for attempt in 0..=MAX_NUMBERED_SUFFIX {
            let candidate = if attempt == 0 {
                name.clone()
            } else {
                join_extension(&format!("{stem}-{attempt}"), ext)
            };
            if let Some(path) = self.try_create(&candidate, bytes).await? {
                return Ok(path);
            }
        }

        let candidate = join_extension(&format!("{stem}-{}", Uuid::new_v4().simple()), ext);
        self.try_create(&candidate, bytes)
            .await?
            .ok_or_else(|| StorageError::InvalidFileName(file_name.to_string()))
    }

    /// Create `name` exclusively. `Ok(None)` means the name is taken.
    async fn try_create(&self, name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, StorageError> {
        let path = self.base_path.join(name);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(Some(path))
    }
}

/// Keep only the final path component and replace characters that are
/// awkward on common filesystems.
pub(crate) fn sanitize_file_name(file_name: &str) -> Result<String, StorageError> {
    let last = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = last
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return Err(StorageError::InvalidFileName(file_name.to_string()));
    }
    Ok(cleaned.to_string())
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

fn join_extension(stem: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stage_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let path = store.stage("order.pdf", b"%PDF-1.7").await.unwrap();
        assert_eq!(path, dir.path().join("order.pdf"));
        assert_eq!(fs::read(&path).await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn stage_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let first = store.stage("list.xlsx", b"first").await.unwrap();
        let second = store.stage("list.xlsx", b"second").await.unwrap();
        let third = store.stage("list.xlsx", b"third").await.unwrap();

        assert_eq!(first, dir.path().join("list.xlsx"));
        assert_eq!(second, dir.path().join("list-1.xlsx"));
        assert_eq!(third, dir.path().join("list-2.xlsx"));
        assert_eq!(fs::read(&first).await.unwrap(), b"first");
        assert_eq!(fs::read(&second).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn stage_falls_back_to_uuid_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        fs::write(dir.path().join("a.png"), b"x").await.unwrap();
        for i in 1..=MAX_NUMBERED_SUFFIX {
            fs::write(dir.path().join(format!("a-{i}.png")), b"x").await.unwrap();
        }

        let path = store.stage("a.png", b"new").await.unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("a-") && name.ends_with(".png"));
        assert_eq!(name.len(), "a-".len() + 32 + ".png".len());
    }

    #[tokio::test]
    async fn stage_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let path = store.stage("../../etc/passwd.pdf", b"x").await.unwrap();
        assert_eq!(path, dir.path().join("passwd.pdf"));

        let path = store.stage(r"C:\Users\me\scan.jpg", b"x").await.unwrap();
        assert_eq!(path, dir.path().join("scan.jpg"));
    }

    #[tokio::test]
    async fn stage_rejects_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        assert!(matches!(
            store.stage("uploads/", b"x").await,
            Err(StorageError::InvalidFileName(_))
        ));
        assert!(store.stage("..", b"x").await.is_err());
    }

    #[tokio::test]
    async fn stage_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("missing"));
        assert!(matches!(
            store.stage("a.pdf", b"x").await,
            Err(StorageError::Io(_))
        ));
    }

    #[tokio::test]
    async fn ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("a/b/uploads"));
        store.ensure_dir().await.unwrap();
        assert!(store.base_path().is_dir());
        store.stage("x.pdf", b"x").await.unwrap();
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_file_name("a:b?.pdf").unwrap(), "a_b_.pdf");
        assert_eq!(sanitize_file_name(".hidden.png").unwrap(), "hidden.png");
    }

    #[test]
    fn split_extension_cases() {
        assert_eq!(split_extension("a.tar.xlsx"), ("a.tar", Some("xlsx")));
        assert_eq!(split_extension("README"), ("README", None));
    }
}
