//! Pipeline integration tests.
//!
//! The external tools are replaced by [`FakeTools`], a `ToolRunner` that
//! reproduces each program's effect on disk: the compiler writes
//! `{base}.pdf`, the burst writes `pg_NNNN.pdf` + `doc_data.txt` into its
//! working directory, and the converters copy their input forward while
//! tagging it. Every burst page carries its page number in its content, so
//! page-order mistakes show up in the final artifacts.
//!
//! Run with:
//!   cargo test --test pipeline

use futures::future::BoxFuture;
use lilycrop::{
    crop_document, crop_score, CropConfig, CropConfigBuilder, CropProgressCallback,
    CroppedArtifact, ErrorKind, Invocation, LilycropError, OutputFormat, Stage, ToolOutput,
    ToolRunner,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Fake toolchain ───────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeTools {
    /// Pages the compiled document has.
    pages: usize,
    /// Pages the burst actually writes, when it should disagree.
    burst_pages: Option<usize>,
    /// Leave `NumberOfPages` out of the metadata dump.
    omit_page_count: bool,
    /// Fail the given stage when its subject path contains the string.
    fail: Option<(Stage, &'static str)>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeTools {
    fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    fn stages(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().iter().map(|c| c.stage).collect()
    }

    fn count(&self, stage: Stage) -> usize {
        self.stages().into_iter().filter(|s| *s == stage).count()
    }

    fn subjects(&self, stage: Stage) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.stage == stage)
            .map(|c| c.subject.clone())
            .collect()
    }

    fn simulate(&self, inv: Invocation) -> Result<ToolOutput, LilycropError> {
        self.calls.lock().unwrap().push(inv.clone());

        if let Some((stage, needle)) = self.fail {
            if inv.stage == stage && inv.subject.to_string_lossy().contains(needle) {
                return Err(LilycropError::ToolFailed {
                    stage,
                    program: inv.program.clone(),
                    path: inv.subject.clone(),
                    status: "exit status: 1".into(),
                    stderr: "simulated failure".into(),
                });
            }
        }

        let args = inv.args_lossy();
        match inv.stage {
            Stage::Compile => {
                // --pdf -o {base} {score}
                fs::write(format!("{}.pdf", args[2]), "%PDF compiled score").unwrap();
            }
            Stage::CountPages => {
                let mut stdout = String::from(
                    "InfoBegin\nInfoKey: Creator\nInfoValue: LilyPond 2.24.3\nPdfID0: 8a1f\n",
                );
                if !self.omit_page_count {
                    stdout.push_str(&format!("NumberOfPages: {}\n", self.pages));
                }
                stdout.push_str("PageMediaBegin\nPageMediaNumber: 1\n");
                return Ok(ToolOutput {
                    stdout,
                    stderr: String::new(),
                });
            }
            Stage::Burst => {
                let n = self.burst_pages.unwrap_or(self.pages);
                for k in 1..=n {
                    fs::write(inv.resolve(format!("pg_{k:04}.pdf")), format!("page {k}")).unwrap();
                }
                fs::write(inv.resolve("doc_data.txt"), "InfoBegin\n").unwrap();
            }
            Stage::ToEps => {
                // -eps {in} {out}
                let content = fs::read_to_string(&args[1]).unwrap();
                fs::write(&args[2], format!("{content}\n%!PS-Adobe-3.0 EPSF-3.0")).unwrap();
            }
            Stage::TrimBoundingBox => {
                // --copy --bbox {in} {out}
                let content = fs::read_to_string(&args[2]).unwrap();
                fs::write(&args[3], format!("{content}\n%%BoundingBox: 12 10 180 64")).unwrap();
            }
            Stage::ToPdf => {
                // {in} --outfile={out}
                let content = fs::read_to_string(&args[0]).unwrap();
                let out = args[1].strip_prefix("--outfile=").unwrap();
                fs::write(out, format!("{content}\n%PDF tight")).unwrap();
            }
        }
        Ok(ToolOutput::default())
    }
}

impl ToolRunner for FakeTools {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<ToolOutput, LilycropError>> {
        Box::pin(async move { self.simulate(invocation) })
    }
}

// ── Progress recorder ────────────────────────────────────────────────────────

#[derive(Default)]
struct Notices {
    lines: Mutex<Vec<String>>,
}

impl CropProgressCallback for Notices {
    fn on_split(&self, _document: &Path, total_pages: usize) {
        self.lines.lock().unwrap().push(format!("split {total_pages}"));
    }

    fn on_page_cropped(&self, page: usize, _total: usize, input: &Path, output: &Path) {
        self.lines.lock().unwrap().push(format!(
            "page {page}: {} -> {}",
            file_name(input),
            file_name(output)
        ));
    }

    fn on_manifest_entry(&self, manifest: &Path, output: &Path) {
        self.lines.lock().unwrap().push(format!(
            "log {} in {}",
            file_name(output),
            file_name(manifest)
        ));
    }

    fn on_run_complete(&self, outputs: &[CroppedArtifact]) {
        self.lines
            .lock()
            .unwrap()
            .push(format!("done {}", outputs.len()));
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

/// A temp dir containing `{name}.ly`.
fn score(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("{name}.ly"));
    fs::write(&path, "\\version \"2.24.0\"\n{ c'4 d' e' f' }\n").unwrap();
    (dir, path)
}

fn config_with(tools: &Arc<FakeTools>) -> CropConfigBuilder {
    CropConfig::builder().runner(Arc::clone(tools) as Arc<dyn ToolRunner>)
}

/// Sorted file names in `dir`.
fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_page_score_default_flags() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools::with_pages(3));
    let config = config_with(&tools).build().unwrap();

    let output = tokio_test::assert_ok!(crop_score(&input, &config).await);

    let names: Vec<String> = output.output_paths().map(file_name).collect();
    assert_eq!(
        names,
        vec!["sonata-1-crop.pdf", "sonata-2-crop.pdf", "sonata-3-crop.pdf"]
    );
    assert!(output.manifest.is_none());
    assert_eq!(output.stats.page_count, 3);
    assert!(output.stats.split);

    // No page artifacts, EPS intermediates, manifest or burst leftovers.
    assert_eq!(
        listing(dir.path()),
        vec![
            "sonata-1-crop.pdf",
            "sonata-2-crop.pdf",
            "sonata-3-crop.pdf",
            "sonata.ly",
            "sonata.pdf",
        ]
    );
    assert_eq!(tools.count(Stage::ToPdf), 3);
}

#[tokio::test]
async fn single_page_score_eps_with_log() {
    let (dir, input) = score("theme");
    let tools = Arc::new(FakeTools::with_pages(1));
    let config = config_with(&tools)
        .output_format(OutputFormat::Eps)
        .log_enabled(true)
        .build()
        .unwrap();

    let output = crop_score(&input, &config).await.unwrap();

    assert_eq!(output.outputs.len(), 1);
    assert_eq!(output.outputs[0].path, dir.path().join("theme-crop.eps"));
    assert_eq!(output.outputs[0].source, dir.path().join("theme.pdf"));
    assert!(!output.stats.split);

    let manifest = dir.path().join("theme.log");
    assert_eq!(output.manifest.as_deref(), Some(manifest.as_path()));
    assert_eq!(fs::read_to_string(&manifest).unwrap(), "theme-crop.eps\n");

    assert_eq!(
        listing(dir.path()),
        vec!["theme-crop.eps", "theme.log", "theme.ly", "theme.pdf"]
    );
    assert_eq!(tools.count(Stage::Burst), 0);
    assert_eq!(tools.count(Stage::ToPdf), 0);
}

#[tokio::test]
async fn page_k_maps_to_artifact_k() {
    // More than nine pages: lexicographic ordering would put 10 before 2.
    let (dir, input) = score("suite");
    let tools = Arc::new(FakeTools::with_pages(12));
    let config = config_with(&tools).build().unwrap();

    crop_score(&input, &config).await.unwrap();

    for k in 1..=12 {
        let content = fs::read_to_string(dir.path().join(format!("suite-{k}-crop.pdf"))).unwrap();
        assert!(
            content.starts_with(&format!("page {k}\n")),
            "suite-{k}-crop.pdf holds: {content:?}"
        );
        assert!(content.contains("%%BoundingBox"));
    }
}

#[tokio::test]
async fn rerun_replaces_manifest_and_outputs() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools::with_pages(3));
    let config = config_with(&tools).log_enabled(true).build().unwrap();

    crop_score(&input, &config).await.unwrap();
    let first: Vec<Vec<u8>> = (1..=3)
        .map(|k| fs::read(dir.path().join(format!("sonata-{k}-crop.pdf"))).unwrap())
        .collect();

    crop_score(&input, &config).await.unwrap();
    let second: Vec<Vec<u8>> = (1..=3)
        .map(|k| fs::read(dir.path().join(format!("sonata-{k}-crop.pdf"))).unwrap())
        .collect();

    assert_eq!(first, second);
    let manifest = fs::read_to_string(dir.path().join("sonata.log")).unwrap();
    assert_eq!(
        manifest,
        "sonata-1-crop.pdf\nsonata-2-crop.pdf\nsonata-3-crop.pdf\n"
    );
}

#[tokio::test]
async fn stale_manifest_is_removed_at_start() {
    let (dir, input) = score("theme");
    fs::write(dir.path().join("theme.log"), "old-crop.pdf\nolder-crop.pdf\n").unwrap();
    let tools = Arc::new(FakeTools::with_pages(1));
    let config = config_with(&tools).log_enabled(true).build().unwrap();

    crop_score(&input, &config).await.unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("theme.log")).unwrap(),
        "theme-crop.pdf\n"
    );
}

#[tokio::test]
async fn eps_output_never_converts_back_to_pdf() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools::with_pages(3));
    let config = config_with(&tools)
        .output_format(OutputFormat::Eps)
        .build()
        .unwrap();

    let output = crop_score(&input, &config).await.unwrap();

    assert_eq!(tools.count(Stage::ToPdf), 0);
    assert!(output
        .outputs
        .iter()
        .all(|o| o.format == OutputFormat::Eps && o.path.extension().unwrap() == "eps"));
    assert_eq!(
        listing(dir.path()),
        vec![
            "sonata-1-crop.eps",
            "sonata-2-crop.eps",
            "sonata-3-crop.eps",
            "sonata.ly",
            "sonata.pdf",
        ]
    );
}

#[tokio::test]
async fn missing_input_is_usage_error_and_compiles_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let tools = Arc::new(FakeTools::with_pages(3));
    let config = config_with(&tools).build().unwrap();

    let err = crop_score(dir.path().join("nowhere.ly"), &config)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(err.exit_code(), 85);
    assert!(tools.stages().is_empty());
}

#[tokio::test]
async fn missing_page_count_aborts_before_split() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools {
        pages: 3,
        omit_page_count: true,
        ..FakeTools::default()
    });
    let config = config_with(&tools).build().unwrap();

    let err = tokio_test::assert_err!(crop_score(&input, &config).await);

    assert!(
        matches!(
            err,
            LilycropError::UnparsableOutput {
                stage: Stage::CountPages,
                ..
            }
        ),
        "got: {err:?}"
    );
    assert_eq!(tools.stages(), vec![Stage::Compile, Stage::CountPages]);
    assert_eq!(listing(dir.path()), vec!["sonata.ly", "sonata.pdf"]);
}

#[tokio::test]
async fn burst_count_mismatch_is_fatal() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools {
        pages: 3,
        burst_pages: Some(2),
        ..FakeTools::default()
    });
    let config = config_with(&tools).build().unwrap();

    let err = crop_score(&input, &config).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Consistency);
    assert!(matches!(
        err,
        LilycropError::PageCountMismatch {
            expected: 3,
            found: 2,
            ..
        }
    ));
    assert_eq!(tools.count(Stage::ToEps), 0);
    // Scratch burst directory is gone, nothing was renamed.
    assert_eq!(listing(dir.path()), vec!["sonata.ly", "sonata.pdf"]);
}

#[tokio::test]
async fn failing_page_aborts_remaining_pages() {
    let (dir, input) = score("sonata");
    let tools = Arc::new(FakeTools {
        pages: 3,
        fail: Some((Stage::TrimBoundingBox, "sonata-2")),
        ..FakeTools::default()
    });
    let config = config_with(&tools).log_enabled(true).build().unwrap();

    let err = crop_score(&input, &config).await.unwrap_err();

    match err {
        LilycropError::ToolFailed { stage, ref path, .. } => {
            assert_eq!(stage, Stage::TrimBoundingBox);
            assert_eq!(path, &dir.path().join("sonata-2.eps"));
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);

    // Page 1 finished, page 3 never started, no cleanup of page 2's leftovers.
    assert!(dir.path().join("sonata-1-crop.pdf").exists());
    assert!(!dir.path().join("sonata-1.pdf").exists());
    assert!(dir.path().join("sonata-2.pdf").exists());
    assert!(!dir.path().join("sonata-3-crop.pdf").exists());
    assert!(!tools
        .subjects(Stage::ToEps)
        .contains(&dir.path().join("sonata-3.pdf")));
    assert_eq!(
        fs::read_to_string(dir.path().join("sonata.log")).unwrap(),
        "sonata-1-crop.pdf\n"
    );
}

#[tokio::test]
async fn parallel_jobs_keep_page_order() {
    let (dir, input) = score("etudes");
    let tools = Arc::new(FakeTools::with_pages(12));
    let notices = Arc::new(Notices::default());
    let config = config_with(&tools)
        .jobs(4)
        .log_enabled(true)
        .progress_callback(Arc::clone(&notices) as Arc<dyn CropProgressCallback>)
        .build()
        .unwrap();

    let output = crop_score(&input, &config).await.unwrap();

    let pages: Vec<usize> = output.outputs.iter().map(|o| o.page).collect();
    assert_eq!(pages, (1..=12).collect::<Vec<_>>());

    let manifest = fs::read_to_string(dir.path().join("etudes.log")).unwrap();
    let expected: String = (1..=12).map(|k| format!("etudes-{k}-crop.pdf\n")).collect();
    assert_eq!(manifest, expected);

    let lines = notices.lines.lock().unwrap();
    let cropped: Vec<&String> = lines.iter().filter(|l| l.starts_with("page ")).collect();
    assert_eq!(cropped.len(), 12);
    assert_eq!(*cropped[9], "page 10: etudes-10.pdf -> etudes-10-crop.pdf");
}

#[tokio::test]
async fn notices_follow_the_run() {
    let (_dir, input) = score("sonata");
    let tools = Arc::new(FakeTools::with_pages(2));
    let notices = Arc::new(Notices::default());
    let config = config_with(&tools)
        .log_enabled(true)
        .progress_callback(Arc::clone(&notices) as Arc<dyn CropProgressCallback>)
        .build()
        .unwrap();

    crop_score(&input, &config).await.unwrap();

    assert_eq!(
        *notices.lines.lock().unwrap(),
        vec![
            "split 2",
            "page 1: sonata-1.pdf -> sonata-1-crop.pdf",
            "log sonata-1-crop.pdf in sonata.log",
            "page 2: sonata-2.pdf -> sonata-2-crop.pdf",
            "log sonata-2-crop.pdf in sonata.log",
            "done 2",
        ]
    );
}

#[tokio::test]
async fn pdf_input_skips_compiler() {
    let dir = tempfile::tempdir().unwrap();
    let document = dir.path().join("sonata.pdf");
    fs::write(&document, "%PDF already compiled").unwrap();
    let tools = Arc::new(FakeTools::with_pages(2));
    let config = config_with(&tools).build().unwrap();

    let output = crop_score(&document, &config).await.unwrap();

    assert_eq!(tools.count(Stage::Compile), 0);
    assert_eq!(output.source, document);
    assert_eq!(output.outputs.len(), 2);
}

#[tokio::test]
async fn output_dir_receives_everything() {
    let (src, input) = score("sonata");
    let out = tempfile::tempdir().unwrap();
    let tools = Arc::new(FakeTools::with_pages(2));
    let config = config_with(&tools)
        .output_dir(out.path().join("build"))
        .log_enabled(true)
        .build()
        .unwrap();

    crop_score(&input, &config).await.unwrap();

    assert_eq!(listing(src.path()), vec!["sonata.ly"]);
    assert_eq!(
        listing(&out.path().join("build")),
        vec![
            "sonata-1-crop.pdf",
            "sonata-2-crop.pdf",
            "sonata.log",
            "sonata.pdf",
        ]
    );
}

#[tokio::test]
async fn crop_document_copies_into_output_dir() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let document = src.path().join("theme.pdf");
    fs::write(&document, "%PDF one page").unwrap();
    let tools = Arc::new(FakeTools::with_pages(1));
    let config = config_with(&tools).output_dir(out.path()).build().unwrap();

    let output = crop_document(&document, &config).await.unwrap();

    assert_eq!(output.outputs[0].path, out.path().join("theme-crop.pdf"));
    assert_eq!(listing(src.path()), vec!["theme.pdf"]);
}
