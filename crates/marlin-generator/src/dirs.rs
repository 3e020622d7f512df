//! Directory helpers shared by the loaders.

use std::{
    io,
    path::{Path, PathBuf},
};

use tokio::fs;

use crate::build::{BuildError, Result};

/// Fail with [`BuildError::MissingDirectory`] unless `dir` is a directory.
pub(crate) async fn require_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(BuildError::MissingDirectory(dir.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(BuildError::MissingDirectory(dir.to_path_buf()))
        }
        Err(source) => Err(BuildError::Read {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Read a file as UTF-8 text. Invalid UTF-8 is an `InvalidData` error.
pub(crate) async fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path).await?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// List a directory's non-hidden entries, sorted by name.
pub(crate) async fn list_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_list_sorted_skips_hidden() {
        let dir = TempDir::new().unwrap();
        for name in ["b.md", "a.md", ".hidden", "c"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let names: Vec<String> = list_sorted(dir.path())
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.md", "b.md", "c"]);
    }

    #[tokio::test]
    async fn test_read_text_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.txt");
        std::fs::write(&good, "Title:\nHi\n").unwrap();
        std::fs::write(&bad, b"Title:\n\xff\xfe\n").unwrap();

        assert_eq!(read_text(&good).await.unwrap(), "Title:\nHi\n");
        let err = read_text(&bad).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(read_text(&dir.path().join("missing.txt")).await.is_err());
    }

    #[tokio::test]
    async fn test_require_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "").unwrap();

        assert!(require_dir(dir.path()).await.is_ok());
        assert!(matches!(
            require_dir(&dir.path().join("missing")).await,
            Err(BuildError::MissingDirectory(_))
        ));
        assert!(matches!(require_dir(&file).await, Err(BuildError::MissingDirectory(_))));
    }
}
