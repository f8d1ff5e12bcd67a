//! Local file system adapter

use std::path::Path;

use async_trait::async_trait;
use curlkit_core::FileSystem;
use tracing::debug;

/// [`FileSystem`] over `tokio::fs`; paths are used exactly as given
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let contents = tokio::fs::read(path).await?;
        debug!(path = %path.display(), bytes = contents.len(), "read file");
        Ok(contents)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        tokio::fs::write(path, contents).await?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binary_contents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let bytes: Vec<u8> = (0..=255u8).rev().collect();

        LocalFileSystem.write(&path, &bytes).await.unwrap();

        assert_eq!(LocalFileSystem.read(&path).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let err = LocalFileSystem.read(&dir.path().join("absent")).await.unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
