//! CLI binary for lilycrop.
//!
//! A thin shim over the library crate that maps CLI flags to `CropConfig`
//! and prints the pipeline's notices.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use lilycrop::{
    count_score_pages, crop_score, CropConfig, CropProgressCallback, CroppedArtifact,
    LilycropError, OutputFormat, ToolCommands, FAILURE_EXIT_CODE, USAGE_EXIT_CODE,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prefix of every stdout notice.
const MARKER: &str = "lilycrop:";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Prints marker-prefixed notices to stdout and keeps a page progress bar on
/// stderr. The bar is suspended while a notice is written so the two never
/// interleave on a shared terminal.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Start with a spinner; `on_run_start` switches to a bar once the page
    /// count is known.
    fn new(input: &Path, show_bar: bool) -> Arc<Self> {
        let bar = if show_bar {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message(input.display().to_string());
        if show_bar {
            bar.enable_steady_tick(Duration::from_millis(80));
        }

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Cropping");
    }

    fn notice(&self, line: String) {
        self.bar.suspend(|| println!("{MARKER} {line}"));
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl CropProgressCallback for CliProgressCallback {
    fn on_run_start(&self, _document: &Path, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_split(&self, document: &Path, total_pages: usize) {
        self.notice(format!(
            "{} has {total_pages} pages, splitting",
            document.display()
        ));
    }

    fn on_page_start(&self, page: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page}"));
    }

    fn on_page_cropped(&self, _page: usize, _total_pages: usize, input: &Path, output: &Path) {
        self.notice(format!("{} -> {}", input.display(), output.display()));
        self.bar.inc(1);
    }

    fn on_manifest_entry(&self, manifest: &Path, output: &Path) {
        self.notice(format!(
            "logged {} in {}",
            output.display(),
            manifest.display()
        ));
    }

    fn on_run_complete(&self, _outputs: &[CroppedArtifact]) {
        self.clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Crop every page of a score to PDF
  lilycrop sonata.ly

  # EPS output plus a sonata.log manifest of produced files
  lilycrop -e -l sonata.ly

  # Crop an already compiled PDF, four pages at a time
  lilycrop -j 4 sonata.pdf

  # Put everything in another directory
  lilycrop -o build/ sonata.ly

  # Machine-readable report
  lilycrop --json sonata.ly > report.json

OUTPUT NAMES:
  1 page:   {base}-crop.{pdf|eps}
  N pages:  {base}-1-crop.{pdf|eps} … {base}-N-crop.{pdf|eps}
  manifest: {base}.log   (-l only; replaced on every run)

EXIT CODES:
  0   success
  85  usage error (no input, unknown flag, input file missing)
  1   an external tool failed, or the split disagreed with the page count

REQUIRED TOOLS:
  lilypond   compile the score           LILYCROP_LILYPOND
  pdftk      count pages, burst          LILYCROP_PDFTK
  pdftops    PDF → EPS (poppler-utils)   LILYCROP_PDFTOPS
  epstool    tight bounding box          LILYCROP_EPSTOOL
  epstopdf   EPS → PDF                   LILYCROP_EPSTOPDF
"#;

/// Crop every page of a LilyPond score to a tight EPS or PDF.
#[derive(Parser, Debug)]
#[command(
    name = "lilycrop",
    version,
    about = "Crop every page of a LilyPond score to a tight EPS or PDF",
    long_about = "Compile a LilyPond score, split the result into single pages and crop \
each page to the bounding box of its actual content. Produces one file per page, \
ready to embed as a music example.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// LilyPond source (`.ly`) or an already compiled `.pdf`.
    input: PathBuf,

    /// Produce EPS instead of PDF.
    #[arg(short = 'e', long = "eps", env = "LILYCROP_EPS")]
    eps: bool,

    /// Write a `{base}.log` manifest listing every produced file.
    #[arg(short = 'l', long = "log", env = "LILYCROP_LOG")]
    log: bool,

    /// Directory for the compiled document and all cropped files.
    #[arg(short, long, env = "LILYCROP_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Number of pages cropped concurrently.
    #[arg(short, long, env = "LILYCROP_JOBS", default_value_t = 1)]
    jobs: usize,

    /// Compile and print the page count only.
    #[arg(long)]
    count_only: bool,

    /// Print a JSON report instead of notices.
    #[arg(long, env = "LILYCROP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "LILYCROP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LILYCROP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LILYCROP_QUIET")]
    quiet: bool,

    /// Notation compiler.
    #[arg(long, env = "LILYCROP_LILYPOND", default_value = "lilypond")]
    lilypond: String,

    /// Page counter and burst tool.
    #[arg(long, env = "LILYCROP_PDFTK", default_value = "pdftk")]
    pdftk: String,

    /// PDF → EPS converter.
    #[arg(long, env = "LILYCROP_PDFTOPS", default_value = "pdftops")]
    pdftops: String,

    /// Bounding-box trimmer.
    #[arg(long, env = "LILYCROP_EPSTOOL", default_value = "epstool")]
    epstool: String,

    /// EPS → PDF converter.
    #[arg(long, env = "LILYCROP_EPSTOPDF", default_value = "epstopdf")]
    epstopdf: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(USAGE_EXIT_CODE),
            };
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would duplicate the notices; keep them for -v.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_notices = !cli.quiet && !cli.json;
    let progress =
        show_notices.then(|| CliProgressCallback::new(&cli.input, !cli.no_progress && !cli.verbose));

    let result = run(&cli, progress.clone()).await;
    if let Some(ref p) = progress {
        p.clear();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<LilycropError>()
                .map(LilycropError::exit_code)
                .unwrap_or(FAILURE_EXIT_CODE);
            eprintln!("{} {:#}", red("✘"), e);
            if code == USAGE_EXIT_CODE {
                eprintln!("\n{}", Cli::command().render_usage());
            }
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<()> {
    let config = build_config(cli, progress)?;

    if cli.count_only {
        let pages = count_score_pages(&cli.input, &config)
            .await
            .with_context(|| format!("Failed to count pages of {}", cli.input.display()))?;
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "input": cli.input, "pages": pages })
            );
        } else {
            println!("{pages}");
        }
        return Ok(());
    }

    let output = crop_score(&cli.input, &config)
        .await
        .with_context(|| format!("Failed to crop {}", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {} {} file(s)  {}ms",
            green("✔"),
            bold(&output.outputs.len().to_string()),
            config.output_format,
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `CropConfig`.
fn build_config(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<CropConfig> {
    let tools = ToolCommands {
        lilypond: cli.lilypond.clone(),
        pdftk: cli.pdftk.clone(),
        pdftops: cli.pdftops.clone(),
        epstool: cli.epstool.clone(),
        epstopdf: cli.epstopdf.clone(),
    };

    let format = if cli.eps {
        OutputFormat::Eps
    } else {
        OutputFormat::Pdf
    };

    let mut builder = CropConfig::builder()
        .output_format(format)
        .log_enabled(cli.log)
        .jobs(cli.jobs)
        .tools(tools);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as Arc<dyn CropProgressCallback>);
    }

    builder.build().context("Invalid configuration")
}
