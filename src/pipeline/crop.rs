//! Page cropping: the fixed three-stage bounding-box pipeline.
//!
//! ```text
//! {stem}.pdf ──pdftops -eps──▶ {stem}.eps ──epstool --bbox──▶ {stem}-crop.eps
//!                                                                 │
//!                                   PDF output: ──epstopdf──▶ {stem}-crop.pdf
//! ```
//!
//! The compiler's own EPS backend reports page-sized bounding boxes.
//! `epstool` re-measures the drawn content and rewrites the
//! `%%BoundingBox` header; nothing is re-rendered.
//!
//! Cleanup depends on the format: for EPS output the tightened EPS *is* the
//! result and only the raw EPS is removed; for PDF output both EPS files
//! are removed once the PDF exists.

use crate::config::{OutputFormat, ToolCommands};
use crate::error::LilycropError;
use crate::output::CroppedArtifact;
use crate::pipeline::{expect_artifact, naming, remove_artifact};
use crate::tool::{Invocation, Stage, ToolRunner};
use std::ffi::OsString;
use std::path::Path;
use tracing::info;

/// Crop one single-page document into `{stem}-crop.{ext}`.
///
/// `page` is only carried into the returned artifact; it does not affect
/// any file name.
pub async fn crop(
    runner: &dyn ToolRunner,
    tools: &ToolCommands,
    input: &Path,
    page: usize,
    format: OutputFormat,
) -> Result<CroppedArtifact, LilycropError> {
    let eps = naming::eps_path(input);
    let trimmed = naming::trimmed_eps_path(input);

    // ── Stage 1: PDF → EPS ───────────────────────────────────────────────
    runner
        .run(
            Invocation::new(Stage::ToEps, &tools.pdftops, input)
                .arg("-eps")
                .arg(input)
                .arg(&eps),
        )
        .await?;
    expect_artifact(Stage::ToEps, &tools.pdftops, &eps).await?;

    // ── Stage 2: tighten the bounding box ────────────────────────────────
    runner
        .run(
            Invocation::new(Stage::TrimBoundingBox, &tools.epstool, &eps)
                .arg("--copy")
                .arg("--bbox")
                .arg(&eps)
                .arg(&trimmed),
        )
        .await?;
    expect_artifact(Stage::TrimBoundingBox, &tools.epstool, &trimmed).await?;

    // ── Stage 3: re-encode or keep ───────────────────────────────────────
    let output = match format {
        OutputFormat::Eps => {
            remove_artifact(&eps).await?;
            trimmed
        }
        OutputFormat::Pdf => {
            let pdf = naming::cropped_path(input, OutputFormat::Pdf);
            let mut outfile = OsString::from("--outfile=");
            outfile.push(&pdf);
            runner
                .run(
                    Invocation::new(Stage::ToPdf, &tools.epstopdf, &trimmed)
                        .arg(&trimmed)
                        .arg(outfile),
                )
                .await?;
            expect_artifact(Stage::ToPdf, &tools.epstopdf, &pdf).await?;
            remove_artifact(&eps).await?;
            remove_artifact(&trimmed).await?;
            pdf
        }
    };

    info!("Cropped {} → {}", input.display(), output.display());

    Ok(CroppedArtifact {
        page,
        source: input.to_path_buf(),
        path: output,
        format,
    })
}
