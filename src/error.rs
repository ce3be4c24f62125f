//! Error types for the lilycrop library.
//!
//! Every failure is fatal: the pipeline is fail-fast and a single page that
//! cannot be cropped aborts the remaining pages. [`LilycropError`] therefore
//! has no partial-success companion. Instead each variant is classified by
//! [`LilycropError::kind`] so the CLI can map usage mistakes to their
//! dedicated exit code and report everything else uniformly.

use crate::tool::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit code for usage errors (no input, unknown flag, missing file).
pub const USAGE_EXIT_CODE: u8 = 85;

/// Process exit code for every other failure.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// All errors returned by the lilycrop library.
#[derive(Debug, Error)]
pub enum LilycropError {
    // ── Usage errors ──────────────────────────────────────────────────────
    /// No input file was given.
    #[error("No input file given.\nUsage: lilycrop [-e] [-l] <file.ly>")]
    MissingInput,

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is a regular file.")]
    InputNotFound { path: PathBuf },

    /// The input path has no usable file stem to derive output names from.
    #[error("Invalid input '{path}': cannot derive an output base name from it")]
    InvalidInput { path: PathBuf },

    // ── Tool invocation errors ────────────────────────────────────────────
    /// The external program could not be started at all.
    #[error("{stage}: could not launch '{program}': {source}\nCheck that it is installed and on PATH.")]
    ToolLaunchFailed {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program exited with a nonzero status.
    #[error("{stage}: '{program}' failed on '{path}' ({status})\n{stderr}")]
    ToolFailed {
        stage: Stage,
        program: String,
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// The program succeeded but its output did not contain what we need.
    #[error("{stage}: could not read {what} from '{program}' output for '{path}'")]
    UnparsableOutput {
        stage: Stage,
        program: String,
        path: PathBuf,
        what: &'static str,
    },

    /// The program succeeded but the file it should have written is absent.
    #[error("{stage}: '{program}' exited successfully but did not produce '{expected}'")]
    MissingArtifact {
        stage: Stage,
        program: String,
        expected: PathBuf,
    },

    // ── Consistency errors ────────────────────────────────────────────────
    /// The burst produced a different number of pages than were counted.
    #[error("Burst of '{path}' produced {found} pages, expected {expected}")]
    PageCountMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// The burst produced the right number of pages but with gaps or repeats.
    #[error("Burst of '{path}' produced page indices {indices:?}, expected 1..={expected}")]
    NonContiguousPages {
        path: PathBuf,
        expected: usize,
        indices: Vec<usize>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A filesystem operation on an artifact failed.
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`LilycropError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad invocation; nothing was touched.
    Usage,
    /// An external program failed or produced unusable output.
    ToolInvocation,
    /// Split artifacts disagree with the counted pages.
    Consistency,
    /// Filesystem failure while renaming, deleting or logging.
    Io,
    /// Invalid [`crate::CropConfig`].
    Config,
    /// Anything else.
    Internal,
}

impl LilycropError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput | Self::InputNotFound { .. } | Self::InvalidInput { .. } => {
                ErrorKind::Usage
            }
            Self::ToolLaunchFailed { .. }
            | Self::ToolFailed { .. }
            | Self::UnparsableOutput { .. }
            | Self::MissingArtifact { .. } => ErrorKind::ToolInvocation,
            Self::PageCountMismatch { .. } | Self::NonContiguousPages { .. } => {
                ErrorKind::Consistency
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The process exit code the CLI should terminate with.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Usage => USAGE_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }

    /// Build a `map_err` adapter for a failed filesystem operation.
    pub(crate) fn io(
        action: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> LilycropError {
        let path = path.into();
        move |source| LilycropError::Io {
            action,
            path,
            source,
        }
    }
}
