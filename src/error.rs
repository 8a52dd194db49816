//! Error types for the pdf2pohoda library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2PohodaError`], **fatal**: the run cannot proceed at all
//!   (missing environment value, bad input path, empty directory). Returned
//!   as `Err(Pdf2PohodaError)` from configuration loading and input
//!   resolution, and from the individual pipeline stages.
//!
//! * [`FileError`], **non-fatal**: a single PDF failed (unreadable file,
//!   LLM call error, output not writable) but the rest of the batch is fine.
//!   Stored inside [`crate::output::FileOutcome`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad invoice.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2pohoda library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::FileOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2PohodaError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// A required environment value is absent or empty.
    #[error("Missing required environment variable {var}\nSet it in the environment or in a .env file.")]
    MissingEnv { var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Usage errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Path not found: '{path}'")]
    PathNotFound { path: PathBuf },

    /// Input is a file, but not one with a `.pdf` extension.
    #[error("File is not a PDF: '{path}'\nExpected a path ending in .pdf")]
    NotAPdf { path: PathBuf },

    /// Input exists but is neither a regular file nor a directory.
    #[error("'{path}' is neither a file nor a directory")]
    NotAFileOrDirectory { path: PathBuf },

    /// Directory input contained no PDF files.
    #[error("No PDF files found in directory '{dir}'")]
    NoPdfsInDirectory { dir: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or set PDFIUM_LIB_PATH to the directory containing it."
    )]
    PdfiumBindingFailed(String),

    /// pdfium could not open or parse the document.
    #[error("PDF '{path}' could not be read: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The LLM API call failed.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output XML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not list a directory.
    #[error("Failed to read directory '{path}': {source}")]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// At least one file in the batch failed.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`] when the
    /// caller wants to treat any per-file failure as an error.
    #[error("{failed}/{total} files failed; see the error log for details")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single PDF in a batch.
///
/// The variant records which stage failed; `detail` carries the underlying
/// error text exactly as it is written to the error log.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// Text extraction failed.
    #[error("{file}: text extraction failed: {detail}")]
    Extraction { file: PathBuf, detail: String },

    /// The LLM call failed.
    #[error("{file}: XML generation failed: {detail}")]
    Generation { file: PathBuf, detail: String },

    /// The XML file could not be written.
    #[error("{file}: writing XML failed: {detail}")]
    Write { file: PathBuf, detail: String },
}

impl FileError {
    /// The PDF this error belongs to.
    pub fn file(&self) -> &PathBuf {
        match self {
            FileError::Extraction { file, .. }
            | FileError::Generation { file, .. }
            | FileError::Write { file, .. } => file,
        }
    }

    /// The underlying error text, without the file/stage prefix.
    pub fn detail(&self) -> &str {
        match self {
            FileError::Extraction { detail, .. }
            | FileError::Generation { detail, .. }
            | FileError::Write { detail, .. } => detail,
        }
    }
}
