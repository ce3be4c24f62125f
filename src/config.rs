//! Configuration types for a crop run.
//!
//! All run behaviour is controlled through [`CropConfig`], built via its
//! [`CropConfigBuilder`]. The config is constructed once from parsed
//! arguments and passed by reference into every pipeline stage; nothing
//! in the pipeline reads ambient process state to decide what to do.

use crate::error::LilycropError;
use crate::progress::ProgressCallback;
use crate::tool::ToolRunner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for [`CropConfig::jobs`].
pub const MAX_JOBS: usize = 64;

/// Configuration for one crop run.
///
/// # Example
/// ```rust
/// use lilycrop::{CropConfig, OutputFormat};
///
/// let config = CropConfig::builder()
///     .output_format(OutputFormat::Eps)
///     .log_enabled(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_format.extension(), "eps");
/// ```
#[derive(Clone)]
pub struct CropConfig {
    /// Format of the final cropped artifacts. Default: [`OutputFormat::Pdf`].
    pub output_format: OutputFormat,

    /// Write a `{base}.log` manifest listing every produced file. Default: false.
    pub log_enabled: bool,

    /// Number of pages cropped concurrently. Default: 1.
    ///
    /// Results, notices and manifest lines are always produced in ascending
    /// page order regardless of this value.
    pub jobs: usize,

    /// Directory receiving the compiled document and all artifacts.
    /// If None, the input file's own directory is used.
    pub output_dir: Option<PathBuf>,

    /// Program names (or paths) of the external tools.
    pub tools: ToolCommands,

    /// Pre-constructed tool runner. If None, [`crate::tool::SystemRunner`] is used.
    pub runner: Option<Arc<dyn ToolRunner>>,

    /// Receiver for per-page notices. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            log_enabled: false,
            jobs: 1,
            output_dir: None,
            tools: ToolCommands::default(),
            runner: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CropConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CropConfig")
            .field("output_format", &self.output_format)
            .field("log_enabled", &self.log_enabled)
            .field("jobs", &self.jobs)
            .field("output_dir", &self.output_dir)
            .field("tools", &self.tools)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn ToolRunner>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn CropProgressCallback>"),
            )
            .finish()
    }
}

impl CropConfig {
    /// Create a new builder for `CropConfig`.
    pub fn builder() -> CropConfigBuilder {
        CropConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CropConfig`].
#[derive(Debug)]
pub struct CropConfigBuilder {
    config: CropConfig,
}

impl CropConfigBuilder {
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn log_enabled(mut self, v: bool) -> Self {
        self.config.log_enabled = v;
        self
    }

    pub fn jobs(mut self, n: usize) -> Self {
        self.config.jobs = n.max(1);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn tools(mut self, tools: ToolCommands) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.config.runner = Some(runner);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CropConfig, LilycropError> {
        let c = &self.config;
        if c.jobs == 0 || c.jobs > MAX_JOBS {
            return Err(LilycropError::InvalidConfig(format!(
                "jobs must be 1–{MAX_JOBS}, got {}",
                c.jobs
            )));
        }
        if let Some(name) = c.tools.first_empty() {
            return Err(LilycropError::InvalidConfig(format!(
                "tool command for '{name}' is empty"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Final artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Encapsulated PostScript: the tightened intermediate is kept as-is.
    Eps,
    /// PDF, re-encoded from the tightened EPS. (default)
    #[default]
    Pdf,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Eps => "eps",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Program names of the external collaborators.
///
/// Each field may be a bare name resolved through `PATH` or a full path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommands {
    /// Notation compiler. Default: `lilypond`.
    pub lilypond: String,
    /// Page counter and burst tool. Default: `pdftk`.
    pub pdftk: String,
    /// PDF → EPS converter. Default: `pdftops`.
    pub pdftops: String,
    /// Bounding-box trimmer. Default: `epstool`.
    pub epstool: String,
    /// EPS → PDF converter. Default: `epstopdf`.
    pub epstopdf: String,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            lilypond: "lilypond".to_string(),
            pdftk: "pdftk".to_string(),
            pdftops: "pdftops".to_string(),
            epstool: "epstool".to_string(),
            epstopdf: "epstopdf".to_string(),
        }
    }
}

impl ToolCommands {
    fn first_empty(&self) -> Option<&'static str> {
        [
            ("lilypond", &self.lilypond),
            ("pdftk", &self.pdftk),
            ("pdftops", &self.pdftops),
            ("epstool", &self.epstool),
            ("epstopdf", &self.epstopdf),
        ]
        .into_iter()
        .find(|(_, cmd)| cmd.trim().is_empty())
        .map(|(name, _)| name)
    }
}
