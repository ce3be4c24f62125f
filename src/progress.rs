//! Progress-callback trait for per-page crop events.
//!
//! Inject an [`Arc<dyn CropProgressCallback>`] via
//! [`crate::config::CropConfigBuilder::progress_callback`] to receive the
//! human-readable notices of a run: the page count when a document is
//! split, one notice per produced artifact, and one per manifest line.
//! The library itself never prints; the CLI turns these events into its
//! marker-prefixed stdout lines.
//!
//! # Example
//!
//! ```rust
//! use lilycrop::{CropProgressCallback, CropConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     cropped: AtomicUsize,
//! }
//!
//! impl CropProgressCallback for CountingCallback {
//!     fn on_page_cropped(&self, page: usize, total: usize, _input: &Path, output: &Path) {
//!         self.cropped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{page}/{total} -> {}", output.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { cropped: AtomicUsize::new(0) });
//!
//! let config = CropConfig::builder()
//!     .progress_callback(counter as Arc<dyn CropProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::CroppedArtifact;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Ordering
///
/// `on_page_cropped` and `on_manifest_entry` always arrive in ascending page
/// order. With `jobs > 1`, `on_page_start` may fire for several pages before
/// the first of them completes.
pub trait CropProgressCallback: Send + Sync {
    /// Called once the page count is known.
    fn on_run_start(&self, document: &Path, total_pages: usize) {
        let _ = (document, total_pages);
    }

    /// Called before a multi-page document is burst into single pages.
    fn on_split(&self, document: &Path, total_pages: usize) {
        let _ = (document, total_pages);
    }

    /// Called just before the first conversion stage of a page.
    fn on_page_start(&self, page: usize, total_pages: usize) {
        let _ = (page, total_pages);
    }

    /// Called when a page's final artifact exists on disk.
    ///
    /// # Arguments
    /// * `page`   — 1-indexed page number
    /// * `input`  — the single-page document that was cropped
    /// * `output` — the cropped artifact
    fn on_page_cropped(&self, page: usize, total_pages: usize, input: &Path, output: &Path) {
        let _ = (page, total_pages, input, output);
    }

    /// Called after an output path was appended to the manifest.
    fn on_manifest_entry(&self, manifest: &Path, output: &Path) {
        let _ = (manifest, output);
    }

    /// Called once after every page was cropped successfully.
    fn on_run_complete(&self, outputs: &[CroppedArtifact]) {
        let _ = outputs;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CropProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CropConfig`].
pub type ProgressCallback = Arc<dyn CropProgressCallback>;
