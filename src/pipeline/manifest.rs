//! Optional run manifest: `{base}.log`, one produced file per line.
//!
//! The manifest's existence on disk is its state. Creating one removes
//! whatever a previous run left under the same name, so a re-run yields
//! exactly one line per page rather than accumulating.

use crate::error::LilycropError;
use crate::pipeline::remove_if_exists;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Handle to a manifest file created for the current run.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    /// Start a fresh, empty manifest at `path`, replacing any previous one.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, LilycropError> {
        let path = path.into();
        if remove_if_exists(&path).await? {
            debug!("Replaced previous manifest {}", path.display());
        }
        tokio::fs::write(&path, b"")
            .await
            .map_err(LilycropError::io("create manifest", &path))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one produced artifact as a newline-terminated line.
    ///
    /// Entries are file names: the manifest sits in the same directory as
    /// the artifacts it lists.
    pub async fn append(&self, artifact: &Path) -> Result<(), LilycropError> {
        let entry = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| artifact.to_string_lossy().into_owned());

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(LilycropError::io("open manifest", &self.path))?;
        file.write_all(format!("{entry}\n").as_bytes())
            .await
            .map_err(LilycropError::io("append to manifest", &self.path))?;
        file.flush()
            .await
            .map_err(LilycropError::io("append to manifest", &self.path))?;
        Ok(())
    }

    /// Read the entries back, in order.
    pub async fn entries(&self) -> Result<Vec<String>, LilycropError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(LilycropError::io("read manifest", &self.path))?;
        Ok(text.lines().map(str::to_string).collect())
    }
}
