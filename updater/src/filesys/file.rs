//! Read-only file probes

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::errors::UpdateError;

/// A file wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file (or directory) exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, UpdateError> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    /// Read file contents, returning `None` when the file does not exist
    pub async fn read_optional(&self) -> Result<Option<String>, UpdateError> {
        match self.read_string().await {
            Ok(contents) => Ok(Some(contents)),
            Err(UpdateError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

}
