//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::batch::Pipeline::with_progress`] to receive events as the batch
//! driver works through the PDFs. The CLI renders them as a progress bar;
//! library callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf2pohoda::BatchProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_error(&self, index: usize, total: usize, file: &str, error: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {file}: {error}", index + 1, total);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each file.
///
/// Files are processed strictly one at a time, so calls never overlap. All
/// methods have default no-op implementations.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file's text is extracted.
    ///
    /// `index` is 0-based.
    fn on_file_start(&self, index: usize, total_files: usize, file: &str) {
        let _ = (index, total_files, file);
    }

    /// Called after a file's XML has been written (and validated/submitted,
    /// when enabled).
    fn on_file_complete(&self, index: usize, total_files: usize, xml_path: &str) {
        let _ = (index, total_files, xml_path);
    }

    /// Called when a file fails; the batch then moves on.
    fn on_file_error(&self, index: usize, total_files: usize, file: &str, error: &str) {
        let _ = (index, total_files, file, error);
    }

    /// Called once after the last file.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// Shared handle stored on the pipeline.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

