//! Page splitting: burst a multi-page document into ordered single pages.
//!
//! `pdftk <doc> burst` writes `pg_0001.pdf`, `pg_0002.pdf`, … plus a
//! `doc_data.txt` metadata file into its working directory. The burst runs
//! inside a private scratch directory next to the outputs so those fixed
//! names cannot clash with anything already on disk, then each page is
//! renamed to `{base}-{n}.pdf`.
//!
//! The rename is order-critical: page K of the source must become
//! `{base}-K.pdf`. Burst files are therefore ordered by the numeric index
//! in their name, never by directory listing or string order.

use crate::config::ToolCommands;
use crate::error::LilycropError;
use crate::output::PageArtifact;
use crate::pipeline::naming::{self, SourceDocument};
use crate::pipeline::remove_if_exists;
use crate::tool::{Invocation, Stage, ToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Auxiliary metadata file left behind by the burst.
pub const BURST_METADATA_FILE: &str = "doc_data.txt";

static RE_BURST_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pg_(\d+)\.pdf$").unwrap());

/// Burst `source` into `expected` page artifacts, in page order.
///
/// # Errors
/// - Burst tool failure → [`LilycropError::ToolFailed`]
/// - Wrong number of pages → [`LilycropError::PageCountMismatch`]
/// - Gaps or repeats in page indices → [`LilycropError::NonContiguousPages`]
pub async fn split(
    runner: &dyn ToolRunner,
    tools: &ToolCommands,
    source: &SourceDocument,
    expected: usize,
) -> Result<Vec<PageArtifact>, LilycropError> {
    let work = naming::work_dir(source.dir());
    let scratch = tempfile::Builder::new()
        .prefix(".lilycrop-burst-")
        .tempdir_in(work)
        .map_err(LilycropError::io("create burst directory in", work))?;

    // The burst runs with the scratch dir as its cwd, so the document path
    // must not be relative to ours.
    let document = tokio::fs::canonicalize(source.path())
        .await
        .map_err(LilycropError::io("resolve", source.path()))?;

    runner
        .run(
            Invocation::new(Stage::Burst, &tools.pdftk, source.path())
                .arg(&document)
                .arg("burst")
                .current_dir(scratch.path()),
        )
        .await?;

    let bursts = list_burst_pages(scratch.path()).await?;
    check_pages(source.path(), expected, &bursts)?;

    let mut pages = Vec::with_capacity(expected);
    for (page, burst_path) in bursts {
        let target = source.page_path(page);
        debug!("{} → {}", burst_path.display(), target.display());
        tokio::fs::rename(&burst_path, &target)
            .await
            .map_err(LilycropError::io("rename", &burst_path))?;
        pages.push(PageArtifact { page, path: target });
    }

    remove_if_exists(&scratch.path().join(BURST_METADATA_FILE)).await?;
    let scratch_path = scratch.path().to_path_buf();
    scratch
        .close()
        .map_err(LilycropError::io("remove burst directory", scratch_path))?;

    info!("Split {} into {} pages", source.path().display(), pages.len());
    Ok(pages)
}

/// Page index encoded in a burst file name (`pg_0012.pdf` → 12).
pub fn burst_page_index(file_name: &str) -> Option<usize> {
    RE_BURST_PAGE
        .captures(file_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Burst outputs in `dir`, sorted by page index.
async fn list_burst_pages(dir: &Path) -> Result<Vec<(usize, PathBuf)>, LilycropError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(LilycropError::io("list", dir))?;

    let mut pages = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(LilycropError::io("list", dir))?
    {
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(burst_page_index) {
            pages.push((index, entry.path()));
        }
    }

    pages.sort_by_key(|(index, _)| *index);
    Ok(pages)
}

/// The burst must yield exactly pages `1..=expected`.
fn check_pages(
    document: &Path,
    expected: usize,
    pages: &[(usize, PathBuf)],
) -> Result<(), LilycropError> {
    if pages.len() != expected {
        return Err(LilycropError::PageCountMismatch {
            path: document.to_path_buf(),
            expected,
            found: pages.len(),
        });
    }
    let contiguous = pages
        .iter()
        .enumerate()
        .all(|(i, (index, _))| *index == i + 1);
    if !contiguous {
        return Err(LilycropError::NonContiguousPages {
            path: document.to_path_buf(),
            expected,
            indices: pages.iter().map(|(index, _)| *index).collect(),
        });
    }
    Ok(())
}
