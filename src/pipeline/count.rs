//! Page counting: read the page total from the document's metadata dump.
//!
//! `pdftk <doc> dump_data` prints unstructured `Key: value` text. Only the
//! `NumberOfPages` line matters; it being absent, non-numeric or zero is a
//! hard failure because the pipeline cannot choose a branch without it.

use crate::config::ToolCommands;
use crate::error::LilycropError;
use crate::tool::{Invocation, Stage, ToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::info;

static RE_PAGE_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*NumberOfPages:\s*(\d+)\s*$").unwrap());

/// Report the number of pages in `document`.
pub async fn count_pages(
    runner: &dyn ToolRunner,
    tools: &ToolCommands,
    document: &Path,
) -> Result<usize, LilycropError> {
    let output = runner
        .run(
            Invocation::new(Stage::CountPages, &tools.pdftk, document)
                .arg(document)
                .arg("dump_data"),
        )
        .await?;

    let pages = parse_page_count(&output.stdout).ok_or_else(|| LilycropError::UnparsableOutput {
        stage: Stage::CountPages,
        program: tools.pdftk.clone(),
        path: document.to_path_buf(),
        what: "NumberOfPages",
    })?;

    info!("{} has {} page(s)", document.display(), pages);
    Ok(pages)
}

/// Extract a positive `NumberOfPages` value from metadata text.
pub fn parse_page_count(metadata: &str) -> Option<usize> {
    RE_PAGE_COUNT
        .captures(metadata)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .filter(|&n| n > 0)
}
