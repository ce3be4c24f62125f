//! External program execution.
//!
//! Every program the pipeline depends on (the notation compiler, `pdftk`,
//! `pdftops`, `epstool`, `epstopdf`) is launched through a [`ToolRunner`].
//! The pipeline only decides *what* to run and in which order; the runner
//! decides *how*. [`SystemRunner`] spawns real child processes via
//! `tokio::process`, and tests inject a runner that simulates the tools'
//! effects on a temporary directory.

use crate::error::LilycropError;
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::debug;

/// Maximum number of stderr lines carried into [`LilycropError::ToolFailed`].
const STDERR_TAIL_LINES: usize = 8;

/// The pipeline stage an external program runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Notation source → multi-page PDF.
    Compile,
    /// PDF metadata dump used to read the page count.
    CountPages,
    /// Multi-page PDF → one PDF per page.
    Burst,
    /// Single-page PDF → EPS.
    ToEps,
    /// EPS → EPS with a recomputed tight bounding box.
    TrimBoundingBox,
    /// Tightened EPS → PDF.
    ToPdf,
}

impl Stage {
    /// Short human-readable label used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Compile => "compile",
            Stage::CountPages => "page count",
            Stage::Burst => "burst",
            Stage::ToEps => "EPS conversion",
            Stage::TrimBoundingBox => "bounding-box trim",
            Stage::ToPdf => "PDF conversion",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One fully described external program call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<OsString>,
    /// Working directory for the child; inherits ours when `None`.
    pub current_dir: Option<PathBuf>,
    /// The file this call operates on, reported in errors.
    pub subject: PathBuf,
}

impl Invocation {
    pub fn new(stage: Stage, program: impl Into<String>, subject: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            subject: subject.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The call rendered as a shell-like line, for logging only.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Arguments as UTF-8 strings (lossy).
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// The directory relative paths resolve against for this call.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        match &self.current_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        }
    }
}

/// Captured output of a successful program run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes external programs on behalf of the pipeline.
///
/// Implementations must be `Send + Sync`: with `jobs > 1` several page crops
/// run concurrently against the same runner.
///
/// A nonzero exit must be reported as [`LilycropError::ToolFailed`]; the
/// pipeline never inspects exit statuses itself.
pub trait ToolRunner: Send + Sync {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<ToolOutput, LilycropError>>;
}

/// Runs programs as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: Invocation) -> BoxFuture<'_, Result<ToolOutput, LilycropError>> {
        Box::pin(async move {
            debug!(stage = %invocation.stage, "running: {}", invocation.command_line());

            let mut command = tokio::process::Command::new(&invocation.program);
            command
                .args(&invocation.args)
                .stdin(Stdio::null())
                // Fail-fast: dropping the pipeline future must not leave
                // converters running in the background.
                .kill_on_drop(true);
            if let Some(ref dir) = invocation.current_dir {
                command.current_dir(dir);
            }

            let output = command
                .output()
                .await
                .map_err(|source| LilycropError::ToolLaunchFailed {
                    stage: invocation.stage,
                    program: invocation.program.clone(),
                    source,
                })?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            if !output.status.success() {
                return Err(LilycropError::ToolFailed {
                    stage: invocation.stage,
                    program: invocation.program,
                    path: invocation.subject,
                    status: output.status.to_string(),
                    stderr: stderr_tail(&stderr),
                });
            }

            Ok(ToolOutput { stdout, stderr })
        })
    }
}

/// Keep the last few non-empty stderr lines; compilers can be chatty.
fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
