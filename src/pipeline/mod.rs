//! Pipeline stages for score cropping.
//!
//! Each submodule implements exactly one step and delegates the actual
//! file transformation to an external program through
//! [`crate::tool::ToolRunner`]. What lives here is the sequencing, the
//! naming, and the cleanup of intermediates.
//!
//! ## Data Flow
//!
//! ```text
//! compile ──▶ count ──┬── 1 page ───────────────▶ crop
//! (lilypond)  (pdftk) └── N pages ──▶ split ──▶ crop × N
//!                                     (pdftk)   (pdftops, epstool, epstopdf)
//! ```
//!
//! 1. [`compile`]  — notation source → `{base}.pdf`
//! 2. [`count`]    — read `NumberOfPages` from the document metadata
//! 3. [`split`]    — burst into `{base}-{n}.pdf`, preserving page order
//! 4. [`crop`]     — PDF → EPS → tight EPS → (PDF), removing intermediates
//! 5. [`manifest`] — optional `{base}.log` of produced files
//!
//! [`naming`] derives every path used by the stages above.

pub mod compile;
pub mod count;
pub mod crop;
pub mod manifest;
pub mod naming;
pub mod split;

use crate::error::LilycropError;
use crate::tool::Stage;
use std::path::Path;
use tracing::debug;

/// Fail with [`LilycropError::MissingArtifact`] unless `expected` exists.
///
/// Some converters exit 0 even when they wrote nothing.
pub(crate) async fn expect_artifact(
    stage: Stage,
    program: &str,
    expected: &Path,
) -> Result<(), LilycropError> {
    match tokio::fs::try_exists(expected).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(LilycropError::MissingArtifact {
            stage,
            program: program.to_string(),
            expected: expected.to_path_buf(),
        }),
        Err(e) => Err(LilycropError::io("inspect", expected)(e)),
    }
}

/// Delete an intermediate file that must exist.
pub(crate) async fn remove_artifact(path: &Path) -> Result<(), LilycropError> {
    debug!("Removing {}", path.display());
    tokio::fs::remove_file(path)
        .await
        .map_err(LilycropError::io("delete", path))
}

/// Delete a file if present; report whether it existed.
pub(crate) async fn remove_if_exists(path: &Path) -> Result<bool, LilycropError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(LilycropError::io("delete", path)(e)),
    }
}
