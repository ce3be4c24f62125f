//! Crop entry points: the pipeline orchestrator.
//!
//! A run is a small state machine with one branch point:
//!
//! ```text
//! start ──▶ count ──┬── 1 page ──▶ crop(document) ─────────────────────┐
//!                   └── N pages ─▶ split ─▶ for page 1..=N:            ├─▶ done
//!                                            crop(page), delete page ──┘
//! ```
//!
//! Every stage returns a `Result` and the orchestrator short-circuits on the
//! first error: one failing page aborts all remaining pages, nothing is
//! retried and partially produced artifacts are left where they are.

use crate::config::CropConfig;
use crate::error::LilycropError;
use crate::output::{CropOutput, CropStats, CroppedArtifact, PageArtifact};
use crate::pipeline::manifest::Manifest;
use crate::pipeline::naming::{self, SourceDocument};
use crate::pipeline::{compile, count, crop, remove_artifact, split};
use crate::tool::{SystemRunner, ToolRunner};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Compile a notation source and crop every page of the result.
///
/// This is the primary entry point for the library. A `.pdf` input skips
/// compilation and is cropped as-is (see [`crop_document`]).
///
/// # Errors
/// - Input missing or unnameable → usage errors ([`crate::ErrorKind::Usage`])
/// - Any external program failing → tool errors, fail-fast
/// - Burst disagreeing with the page count → consistency errors
pub async fn crop_score(
    input: impl AsRef<Path>,
    config: &CropConfig,
) -> Result<CropOutput, LilycropError> {
    let input = input.as_ref();
    validate_input(input).await?;

    if is_pdf(input) {
        return crop_document(input, config).await;
    }

    let runner = resolve_runner(config);
    let out_dir = prepare_output_dir(input, config).await?;
    let document = compile::compile(runner.as_ref(), &config.tools, input, &out_dir).await?;
    run_pipeline(runner.as_ref(), &document, config).await
}

/// Crop every page of an already compiled multi-page PDF.
///
/// When [`CropConfig::output_dir`] names another directory the document is
/// copied there first, so all derived names live side by side.
pub async fn crop_document(
    document: impl AsRef<Path>,
    config: &CropConfig,
) -> Result<CropOutput, LilycropError> {
    let document = document.as_ref();
    validate_input(document).await?;

    let runner = resolve_runner(config);
    let out_dir = prepare_output_dir(document, config).await?;
    let staged = stage_document(document, &out_dir).await?;
    run_pipeline(runner.as_ref(), &staged, config).await
}

/// Report the page count of a compiled PDF without cropping anything.
pub async fn count_document_pages(
    document: impl AsRef<Path>,
    config: &CropConfig,
) -> Result<usize, LilycropError> {
    let document = document.as_ref();
    validate_input(document).await?;
    let runner = resolve_runner(config);
    count::count_pages(runner.as_ref(), &config.tools, document).await
}

/// Compile a score (if needed) and report its page count.
pub async fn count_score_pages(
    input: impl AsRef<Path>,
    config: &CropConfig,
) -> Result<usize, LilycropError> {
    let input = input.as_ref();
    validate_input(input).await?;
    if is_pdf(input) {
        return count_document_pages(input, config).await;
    }
    let runner = resolve_runner(config);
    let out_dir = prepare_output_dir(input, config).await?;
    let document = compile::compile(runner.as_ref(), &config.tools, input, &out_dir).await?;
    count::count_pages(runner.as_ref(), &config.tools, &document).await
}

/// Synchronous wrapper around [`crop_score`].
///
/// Creates a temporary tokio runtime internally.
pub fn crop_score_sync(
    input: impl AsRef<Path>,
    config: &CropConfig,
) -> Result<CropOutput, LilycropError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| LilycropError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(crop_score(input, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(
    runner: &dyn ToolRunner,
    document: &Path,
    config: &CropConfig,
) -> Result<CropOutput, LilycropError> {
    let total_start = Instant::now();
    let source = SourceDocument::new(document)?;
    info!("Starting crop: {}", document.display());

    // ── Step 1: Fresh manifest ───────────────────────────────────────────
    let manifest = if config.log_enabled {
        Some(Manifest::create(source.manifest_path()).await?)
    } else {
        None
    };

    // ── Step 2: Count pages ──────────────────────────────────────────────
    let total_pages = count::count_pages(runner, &config.tools, source.path()).await?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(source.path(), total_pages);
    }

    // ── Step 3: Crop, directly or page by page ───────────────────────────
    let outputs = if total_pages == 1 {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(1, 1);
        }
        let cropped =
            crop::crop(runner, &config.tools, source.path(), 1, config.output_format).await?;
        record(&cropped, 1, manifest.as_ref(), config).await?;
        vec![cropped]
    } else {
        if let Some(ref cb) = config.progress_callback {
            cb.on_split(source.path(), total_pages);
        }
        let pages = split::split(runner, &config.tools, &source, total_pages).await?;
        crop_pages(runner, &pages, manifest.as_ref(), config).await?
    };
    debug_assert_eq!(outputs.len(), total_pages);

    let stats = CropStats {
        page_count: total_pages,
        split: total_pages > 1,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Crop complete: {} page(s), {}ms total",
        total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&outputs);
    }

    Ok(CropOutput {
        source: document.to_path_buf(),
        outputs,
        manifest: manifest.map(|m| m.path().to_path_buf()),
        stats,
    })
}

/// Crop split pages, up to `config.jobs` at a time.
async fn crop_pages(
    runner: &dyn ToolRunner,
    pages: &[PageArtifact],
    manifest: Option<&Manifest>,
    config: &CropConfig,
) -> Result<Vec<CroppedArtifact>, LilycropError> {
    let total = pages.len();

    // `buffered` yields in submission order, so notices and manifest lines
    // stay in page order whatever the completion order.
    let crops = stream::iter(pages.iter().map(move |page| async move {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page, total);
        }
        let cropped = crop::crop(
            runner,
            &config.tools,
            &page.path,
            page.page,
            config.output_format,
        )
        .await?;
        remove_artifact(&page.path).await?;
        Ok::<_, LilycropError>(cropped)
    }))
    .buffered(config.jobs);
    let mut crops = std::pin::pin!(crops);

    let mut outputs = Vec::with_capacity(total);
    while let Some(result) = crops.next().await {
        let cropped = result?;
        record(&cropped, total, manifest, config).await?;
        outputs.push(cropped);
    }
    Ok(outputs)
}

/// Announce a finished page and log it to the manifest.
async fn record(
    cropped: &CroppedArtifact,
    total: usize,
    manifest: Option<&Manifest>,
    config: &CropConfig,
) -> Result<(), LilycropError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_page_cropped(cropped.page, total, &cropped.source, &cropped.path);
    }
    if let Some(manifest) = manifest {
        manifest.append(&cropped.path).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_manifest_entry(manifest.path(), &cropped.path);
        }
    }
    Ok(())
}

fn resolve_runner(config: &CropConfig) -> Arc<dyn ToolRunner> {
    match config.runner {
        Some(ref runner) => Arc::clone(runner),
        None => Arc::new(SystemRunner),
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// The input must be an existing regular file with a usable base name.
async fn validate_input(path: &Path) -> Result<(), LilycropError> {
    if path.as_os_str().is_empty() {
        return Err(LilycropError::MissingInput);
    }
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(LilycropError::InputNotFound {
                path: path.to_path_buf(),
            })
        }
    }
    naming::base_name(path)?;
    Ok(())
}

/// Resolve (and create) the directory all artifacts go to.
async fn prepare_output_dir(input: &Path, config: &CropConfig) -> Result<PathBuf, LilycropError> {
    match config.output_dir {
        Some(ref dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(LilycropError::io("create output directory", dir))?;
            Ok(dir.clone())
        }
        None => Ok(input.parent().map(Path::to_path_buf).unwrap_or_default()),
    }
}

/// Place `document` in `out_dir` unless it already lives there.
async fn stage_document(document: &Path, out_dir: &Path) -> Result<PathBuf, LilycropError> {
    let source_dir = document.parent().unwrap_or(Path::new(""));
    if same_dir(source_dir, out_dir).await? {
        return Ok(document.to_path_buf());
    }
    let base = naming::base_name(document)?;
    let target = naming::document_path(out_dir, &base);
    debug!("Copying {} → {}", document.display(), target.display());
    tokio::fs::copy(document, &target)
        .await
        .map_err(LilycropError::io("copy document to", &target))?;
    Ok(target)
}

async fn same_dir(a: &Path, b: &Path) -> Result<bool, LilycropError> {
    if a == b {
        return Ok(true);
    }
    let a = naming::work_dir(a);
    let b = naming::work_dir(b);
    let ca = tokio::fs::canonicalize(a)
        .await
        .map_err(LilycropError::io("resolve", a))?;
    let cb = tokio::fs::canonicalize(b)
        .await
        .map_err(LilycropError::io("resolve", b))?;
    Ok(ca == cb)
}
