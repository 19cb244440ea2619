// src/file_manager.rs - Downloaded job artifacts
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct FileManager {
    directory: PathBuf,
}

impl FileManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reduce a server-supplied name to its final path component.
    pub fn sanitize_name(name: &str) -> Result<String, ArtifactError> {
        let candidate = name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if candidate.is_empty() || candidate == "." || candidate == ".." {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        Ok(candidate.to_string())
    }

    /// Write `contents` into the downloads directory under `file_name`.
    pub async fn save_artifact(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, ArtifactError> {
        let name = Self::sanitize_name(file_name)?;
        fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(name);
        tracing::info!("Writing job file: {}", path.display());
        fs::write(&path, contents).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(FileManager::sanitize_name("benchy.gcode").unwrap(), "benchy.gcode");
        assert_eq!(FileManager::sanitize_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(FileManager::sanitize_name("C:\\jobs\\vase.gcode").unwrap(), "vase.gcode");
        assert!(FileManager::sanitize_name("uploads/").is_err());
        assert!(FileManager::sanitize_name("..").is_err());
    }

    #[tokio::test]
    async fn test_save_artifact_creates_directory() {
        let dir = tempdir().unwrap();
        let manager = FileManager::new(dir.path().join("downloads"));
        let path = manager.save_artifact("cube.gcode", b"G28\nG1 X10\n").await.unwrap();
        assert_eq!(path, dir.path().join("downloads").join("cube.gcode"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "G28\nG1 X10\n");
    }
}
