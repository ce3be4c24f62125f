//! Result types returned by the crop entry points.

use crate::config::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One single-page document produced by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifact {
    /// 1-indexed page number; equals the page's position in the source.
    pub page: usize,
    /// `{dir}/{base}-{page}.pdf`
    pub path: PathBuf,
}

/// One final cropped file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CroppedArtifact {
    /// 1-indexed page number.
    pub page: usize,
    /// The single-page document that was cropped (the source document
    /// itself when it has only one page).
    pub source: PathBuf,
    /// `{stem}-crop.{ext}`
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// Timing and shape of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CropStats {
    pub page_count: usize,
    /// Whether the document had to be burst into single pages.
    pub split: bool,
    pub total_duration_ms: u64,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropOutput {
    /// The compiled (or given) multi-page document.
    pub source: PathBuf,
    /// Cropped artifacts in ascending page order.
    pub outputs: Vec<CroppedArtifact>,
    /// Manifest path when logging was enabled.
    pub manifest: Option<PathBuf>,
    pub stats: CropStats,
}

impl CropOutput {
    /// Paths of the produced files, in page order.
    pub fn output_paths(&self) -> impl Iterator<Item = &Path> {
        self.outputs.iter().map(|o| o.path.as_path())
    }
}
