//! # pdf2pohoda
//!
//! Convert PDF invoices into Pohoda `issuedInvoice` XML with a chat model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF (file or directory)
//!  │
//!  ├─ 1. Input     resolve a single .pdf or the .pdf files of a directory
//!  ├─ 2. Extract   text layer of every page via pdfium
//!  ├─ 3. Generate  one chat call at temperature 0 → XML
//!  ├─ 4. Clean     strip a stray ```xml fence, trim
//!  ├─ 5. Write     <name>.xml next to <name>.pdf
//!  ├─ 6. Validate  structural XSD check            (off by default)
//!  └─ 7. Submit    POST to the Pohoda mServer      (off by default)
//! ```
//!
//! Files are processed one at a time. A file that fails is recorded in the
//! error log and the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2pohoda::{ConversionConfig, Pipeline, Settings};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::from_env()?;
//!     let config = ConversionConfig::default();
//!     let pipeline = Pipeline::from_config(&config, &settings)?;
//!     let report = pipeline.convert_path(Path::new("invoices/")).await?;
//!     eprintln!("{}/{} converted", report.succeeded(), report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2pohoda` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod errlog;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{write_xml, xml_path_for, Pipeline};
pub use config::{ConversionConfig, ConversionConfigBuilder, RemoteEndpoint, Settings};
pub use errlog::ErrorLog;
pub use error::{FileError, Pdf2PohodaError};
pub use output::{BatchReport, FileOutcome, FileOutput, FileResult};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::input::{resolve_input, BatchInput};
pub use pipeline::llm::{LlmXmlGenerator, XmlGenerator};
pub use pipeline::postprocess::strip_xml_fence;
pub use pipeline::submit::{HttpSubmitter, SubmissionOutcome, Submitter};
pub use pipeline::validate::{ValidationOutcome, XmlValidator, XsdValidator};
pub use progress::{BatchProgressCallback, ProgressCallback};
