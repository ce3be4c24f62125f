//! Deterministic artifact names.
//!
//! Every path the pipeline writes is derived here from the source
//! document's directory and base name, so two pages can never share an
//! intermediate file and a re-run always lands on the same names.
//!
//! ```text
//! {dir}/{base}.pdf          compiled source document
//! {dir}/{base}-{n}.pdf      page artifact n
//! {stem}.eps                raw EPS of a page (stem = page path minus extension)
//! {stem}-crop.eps           tightened EPS
//! {stem}-crop.pdf           tightened PDF
//! {dir}/{base}.log          manifest
//! ```

use crate::config::OutputFormat;
use crate::error::LilycropError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The multi-page document a run starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    path: PathBuf,
    dir: PathBuf,
    base: String,
}

impl SourceDocument {
    /// Derive directory and base name from a document path.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, LilycropError> {
        let path = path.into();
        let base = base_name(&path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { path, dir, base })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the document; empty for a bare relative file name.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `{dir}/{base}-{page}.pdf`
    pub fn page_path(&self, page: usize) -> PathBuf {
        self.dir.join(format!("{}-{}.pdf", self.base, page))
    }

    /// `{dir}/{base}.log`
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base))
    }
}

/// The input's file name with its last extension stripped.
pub fn base_name(path: &Path) -> Result<String, LilycropError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LilycropError::InvalidInput {
            path: path.to_path_buf(),
        })
}

/// `{dir}/{base}.pdf`, the document the compiler writes.
pub fn document_path(dir: &Path, base: &str) -> PathBuf {
    dir.join(format!("{base}.pdf"))
}

/// `{stem}.eps`
pub fn eps_path(input: &Path) -> PathBuf {
    with_suffix(input, ".eps")
}

/// `{stem}-crop.eps`
pub fn trimmed_eps_path(input: &Path) -> PathBuf {
    with_suffix(input, "-crop.eps")
}

/// `{stem}-crop.{ext}` for the requested format.
pub fn cropped_path(input: &Path, format: OutputFormat) -> PathBuf {
    with_suffix(input, &format!("-crop.{}", format.extension()))
}

/// A directory usable as a child's working directory.
pub fn work_dir(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    }
}

fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let mut stem: OsString = input.with_extension("").into_os_string();
    stem.push(suffix);
    PathBuf::from(stem)
}
