//! # lilycrop
//!
//! Split a typeset LilyPond score into tightly cropped single-page EPS or
//! PDF files, ready to embed as music examples in other documents.
//!
//! ## Why this crate?
//!
//! LilyPond's own EPS backend does not compute visual bounding boxes: every
//! page image keeps the full paper size, so a two-bar excerpt arrives with a
//! page of whitespace around it. This crate drives a chain of standard
//! tools that re-measure the drawn content and rewrite the bounding box,
//! one page at a time, with deterministic output names.
//!
//! ## Pipeline Overview
//!
//! ```text
//! score.ly
//!  │
//!  ├─ 1. Compile  lilypond --pdf            → score.pdf
//!  ├─ 2. Count    pdftk dump_data           → NumberOfPages
//!  ├─ 3. Split    pdftk burst (N > 1 only)  → score-1.pdf … score-N.pdf
//!  ├─ 4. Crop     pdftops -eps, epstool --bbox, [epstopdf]
//!  │                                        → score-1-crop.pdf …
//!  └─ 5. Log      optional score.log manifest, one file per line
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lilycrop::{crop_score, CropConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CropConfig::builder()
//!         .output_format(OutputFormat::Eps)
//!         .log_enabled(true)
//!         .build()?;
//!     let output = crop_score("sonata.ly", &config).await?;
//!     for path in output.output_paths() {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lilycrop` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External tools
//!
//! `lilypond`, `pdftk`, `pdftops` (poppler), `epstool` and `epstopdf` must
//! be installed. Each can be overridden in [`ToolCommands`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod tool;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CropConfig, CropConfigBuilder, OutputFormat, ToolCommands};
pub use error::{ErrorKind, LilycropError, FAILURE_EXIT_CODE, USAGE_EXIT_CODE};
pub use output::{CropOutput, CropStats, CroppedArtifact, PageArtifact};
pub use progress::{CropProgressCallback, NoopProgressCallback, ProgressCallback};
pub use run::{count_document_pages, count_score_pages, crop_document, crop_score, crop_score_sync};
pub use tool::{Invocation, Stage, SystemRunner, ToolOutput, ToolRunner};
