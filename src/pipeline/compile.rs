//! Compiler glue: typeset the notation source into a multi-page PDF.

use crate::config::ToolCommands;
use crate::error::LilycropError;
use crate::pipeline::{expect_artifact, naming};
use crate::tool::{Invocation, Stage, ToolRunner};
use std::path::{Path, PathBuf};
use tracing::info;

/// Run `lilypond --pdf -o {out_dir}/{base} <score>` and return `{out_dir}/{base}.pdf`.
pub async fn compile(
    runner: &dyn ToolRunner,
    tools: &ToolCommands,
    score: &Path,
    out_dir: &Path,
) -> Result<PathBuf, LilycropError> {
    let base = naming::base_name(score)?;
    let document = naming::document_path(out_dir, &base);

    info!("Compiling {} → {}", score.display(), document.display());
    runner
        .run(
            Invocation::new(Stage::Compile, &tools.lilypond, score)
                .arg("--pdf")
                .arg("-o")
                .arg(out_dir.join(&base))
                .arg(score),
        )
        .await?;
    expect_artifact(Stage::Compile, &tools.lilypond, &document).await?;

    Ok(document)
}
