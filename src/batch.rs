//! Batch driver: run the per-file pipeline over one PDF or a directory.
//!
//! ## Per-file pipeline
//!
//! ```text
//! PDF ──▶ extract ──▶ generate ──▶ write <stem>.xml ──▶ [validate] ──▶ [submit]
//! ```
//!
//! Validation and submission are optional stages switched on through
//! [`ConversionConfig`]; with the defaults they never run.
//!
//! Files are processed strictly one after another. A failure in any
//! mandatory stage becomes a [`FileError`], is written to the error log, and
//! the batch moves on to the next file. The process exit code is unaffected
//! unless the caller opts in via [`BatchReport::into_result`].

use crate::config::{ConversionConfig, RemoteEndpoint, Settings};
use crate::errlog::ErrorLog;
use crate::error::{FileError, Pdf2PohodaError};
use crate::output::{BatchReport, FileOutcome, FileOutput, FileResult};
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::input::{resolve_input, BatchInput};
use crate::pipeline::llm::{LlmXmlGenerator, XmlGenerator};
use crate::pipeline::submit::{HttpSubmitter, Submitter};
use crate::pipeline::validate::{XmlValidator, XsdValidator};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Output path for a PDF: same directory, extension replaced by `.xml`.
pub fn xml_path_for(pdf: &Path) -> PathBuf {
    pdf.with_extension("xml")
}

/// Write `xml` to `path`, replacing any existing file.
///
/// Uses a temp file + rename so a crash never leaves a half-written XML
/// where a previous good one used to be.
pub async fn write_xml(path: &Path, xml: &str) -> Result<(), Pdf2PohodaError> {
    let tmp_path = path.with_extension("xml.tmp");
    tokio::fs::write(&tmp_path, xml)
        .await
        .map_err(|e| Pdf2PohodaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Pdf2PohodaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// The assembled per-file pipeline plus its error log.
pub struct Pipeline {
    extractor: Box<dyn TextExtractor>,
    generator: Box<dyn XmlGenerator>,
    validator: Option<Box<dyn XmlValidator>>,
    submission: Option<(Box<dyn Submitter>, RemoteEndpoint)>,
    error_log: ErrorLog,
    progress: Option<ProgressCallback>,
}

impl Pipeline {
    /// A pipeline with only the mandatory stages.
    pub fn new(
        extractor: impl TextExtractor + 'static,
        generator: impl XmlGenerator + 'static,
        error_log: ErrorLog,
    ) -> Self {
        Self {
            extractor: Box::new(extractor),
            generator: Box::new(generator),
            validator: None,
            submission: None,
            error_log,
            progress: None,
        }
    }

    /// Build the production pipeline: pdfium extraction, OpenAI generation,
    /// and the validator/submitter when `config` enables them.
    pub fn from_config(
        config: &ConversionConfig,
        settings: &Settings,
    ) -> Result<Self, Pdf2PohodaError> {
        let error_log = ErrorLog::new(&config.log_path);
        let extractor = PdfiumExtractor::new(config.pdfium_lib_path.as_deref())?;
        let generator = LlmXmlGenerator::openai(&settings.api_key, config);

        let mut pipeline = Self::new(extractor, generator, error_log.clone());
        if config.validate {
            pipeline = pipeline.with_validator(XsdValidator::new(
                &config.schema_path,
                error_log.clone(),
            ));
        }
        if config.submit {
            pipeline =
                pipeline.with_submitter(HttpSubmitter::new(error_log), settings.endpoint.clone());
        }
        Ok(pipeline)
    }

    pub fn with_validator(mut self, validator: impl XmlValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn with_submitter(
        mut self,
        submitter: impl Submitter + 'static,
        destination: RemoteEndpoint,
    ) -> Self {
        self.submission = Some((Box::new(submitter), destination));
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Resolve `path` and run the batch over it.
    ///
    /// Only input resolution can fail here; per-file failures end up in the
    /// returned report.
    pub async fn convert_path(&self, path: &Path) -> Result<BatchReport, Pdf2PohodaError> {
        let input = resolve_input(path)?;
        Ok(self.run(&input).await)
    }

    /// Process every PDF of `input`, one at a time.
    pub async fn run(&self, input: &BatchInput) -> BatchReport {
        let batch_start = Instant::now();
        let pdfs = input.pdfs();
        let total = pdfs.len();
        info!("Processing {} PDF file(s)", total);

        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let mut files = Vec::with_capacity(total);
        for (index, pdf) in pdfs.iter().enumerate() {
            let file_label = pdf.display().to_string();
            if let Some(ref cb) = self.progress {
                cb.on_file_start(index, total, &file_label);
            }

            let start = Instant::now();
            let result = match self.process_file(pdf).await {
                Ok(output) => {
                    if let Some(ref cb) = self.progress {
                        cb.on_file_complete(index, total, &output.xml_path.display().to_string());
                    }
                    FileResult::Converted(output)
                }
                Err(error) => {
                    self.error_log.log(&format!(
                        "Error processing {}: {}",
                        file_label,
                        error.detail()
                    ));
                    if let Some(ref cb) = self.progress {
                        cb.on_file_error(index, total, &file_label, error.detail());
                    }
                    FileResult::Failed { error }
                }
            };

            files.push(FileOutcome {
                pdf_path: pdf.clone(),
                duration_ms: start.elapsed().as_millis() as u64,
                result,
            });
        }

        let report = BatchReport {
            files,
            total_duration_ms: batch_start.elapsed().as_millis() as u64,
        };

        info!(
            "Batch complete: {}/{} files converted, {}ms total",
            report.succeeded(),
            total,
            report.total_duration_ms
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, report.succeeded());
        }

        report
    }

    /// Run the pipeline for one PDF.
    ///
    /// Extraction, generation and writing are mandatory; their failures are
    /// returned as [`FileError`]. Validation and submission failures are
    /// logged by those stages and reported inside the [`FileOutput`].
    pub async fn process_file(&self, pdf: &Path) -> Result<FileOutput, FileError> {
        debug!("Extracting text from {}", pdf.display());
        let text = self
            .extractor
            .extract_text(pdf)
            .map_err(|e| FileError::Extraction {
                file: pdf.to_path_buf(),
                detail: e.to_string(),
            })?;
        if text.is_empty() {
            warn!("{}: no extractable text", pdf.display());
        }

        debug!("Requesting XML for {}", pdf.display());
        let xml = self
            .generator
            .generate(&text)
            .await
            .map_err(|e| FileError::Generation {
                file: pdf.to_path_buf(),
                detail: e.to_string(),
            })?;
        drop(text);

        let xml_path = xml_path_for(pdf);
        write_xml(&xml_path, &xml)
            .await
            .map_err(|e| FileError::Write {
                file: pdf.to_path_buf(),
                detail: e.to_string(),
            })?;
        info!("XML written to {}", xml_path.display());

        let validation = self.validator.as_ref().map(|v| v.validate(&xml));
        let passed_validation = validation.as_ref().is_none_or(|v| v.valid);

        let submission = match &self.submission {
            Some((submitter, destination)) if passed_validation => {
                let file_name = pdf
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| pdf.display().to_string());
                let outcome = submitter.submit(&xml, destination, &file_name).await;
                if outcome.success {
                    info!("Import of {} announced to {}", file_name, destination.url);
                }
                Some(outcome)
            }
            Some(_) => {
                warn!("{}: skipping submission, XML failed validation", pdf.display());
                None
            }
            None => None,
        };

        Ok(FileOutput {
            xml_path,
            xml_len: xml.len(),
            validation,
            submission,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_path_replaces_extension() {
        assert_eq!(xml_path_for(Path::new("in/a.pdf")), PathBuf::from("in/a.xml"));
        assert_eq!(xml_path_for(Path::new("B.PDF")), PathBuf::from("B.xml"));
        assert_eq!(
            xml_path_for(Path::new("faktura.2024.pdf")),
            PathBuf::from("faktura.2024.xml")
        );
    }

    #[tokio::test]
    async fn write_xml_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xml");
        write_xml(&path, "<first/>").await.unwrap();
        write_xml(&path, "<second/>").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<second/>");
        assert!(!dir.path().join("a.xml.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the XML should go makes the rename fail.
        let path = dir.path().join("a.xml");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_xml(&path, "<a/>").await.unwrap_err();

        assert!(matches!(err, Pdf2PohodaError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("a.xml.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
