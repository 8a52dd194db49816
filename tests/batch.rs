//! Integration tests for the batch driver.
//!
//! The pdfium extractor and the chat model are replaced by in-memory fakes,
//! so these run without libpdfium, network access, or API keys.

use async_trait::async_trait;
use pdf2pohoda::{
    BatchProgressCallback, ErrorLog, FileError, Pdf2PohodaError, Pipeline, RemoteEndpoint,
    Settings, SubmissionOutcome, Submitter, TextExtractor, ValidationOutcome, XmlGenerator,
    XmlValidator,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Fails for the listed file names, otherwise returns "text of <name>".
struct FakeExtractor {
    failing: Vec<&'static str>,
}

impl TextExtractor for FakeExtractor {
    fn extract_text(&self, pdf: &Path) -> Result<String, Pdf2PohodaError> {
        let name = pdf.file_name().unwrap().to_string_lossy().into_owned();
        if self.failing.iter().any(|f| *f == name) {
            return Err(Pdf2PohodaError::CorruptPdf {
                path: pdf.to_path_buf(),
                detail: "trailer not found".into(),
            });
        }
        Ok(format!("text of {name}"))
    }
}

/// Returns a fixed XML body and records every prompt text it saw.
struct FakeGenerator {
    xml: String,
    seen: Arc<Mutex<Vec<String>>>,
}

impl FakeGenerator {
    fn new(xml: &str) -> Self {
        Self {
            xml: xml.to_string(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl XmlGenerator for FakeGenerator {
    async fn generate(&self, text: &str) -> Result<String, Pdf2PohodaError> {
        self.seen.lock().unwrap().push(text.to_string());
        Ok(self.xml.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl XmlGenerator for FailingGenerator {
    async fn generate(&self, _text: &str) -> Result<String, Pdf2PohodaError> {
        Err(Pdf2PohodaError::LlmApiError {
            message: "503 Service Unavailable".into(),
        })
    }
}

struct FixedValidator(bool);

impl XmlValidator for FixedValidator {
    fn validate(&self, _xml: &str) -> ValidationOutcome {
        ValidationOutcome {
            valid: self.0,
            errors: if self.0 { vec![] } else { vec!["bad".into()] },
        }
    }
}

#[derive(Default)]
struct RecordingSubmitter {
    calls: Arc<Mutex<Vec<(String, String, String)>>>,
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(
        &self,
        xml: &str,
        destination: &RemoteEndpoint,
        file_name: &str,
    ) -> SubmissionOutcome {
        self.calls.lock().unwrap().push((
            xml.to_string(),
            destination.agenda.clone(),
            file_name.to_string(),
        ));
        SubmissionOutcome {
            success: true,
            status: Some(200),
            detail: None,
        }
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl BatchProgressCallback for RecordingProgress {
    fn on_batch_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }
    fn on_file_complete(&self, index: usize, _total: usize, _xml_path: &str) {
        self.events.lock().unwrap().push(format!("ok {index}"));
    }
    fn on_file_error(&self, index: usize, _total: usize, _file: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("err {index}"));
    }
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success_count}/{total_files}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn invoice_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"%PDF-1.4 fake").unwrap();
    }
    dir
}

fn log_in(dir: &TempDir) -> ErrorLog {
    ErrorLog::new(dir.path().join("errors.log"))
}

fn log_lines(log: &ErrorLog) -> Vec<String> {
    std::fs::read_to_string(log.path())
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn endpoint() -> RemoteEndpoint {
    RemoteEndpoint {
        url: "http://pohoda.invalid/xml".into(),
        username: "admin".into(),
        password: "secret".into(),
        agenda: "12345678".into(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_batch_processes_only_pdfs() {
    let dir = invoice_dir(&["a.pdf", "b.pdf", "c.txt"]);
    let generator = FakeGenerator::new("<dat:dataPack/>");
    let seen = Arc::clone(&generator.seen);
    let pipeline = Pipeline::new(FakeExtractor { failing: vec![] }, generator, log_in(&dir));

    let report = pipeline.convert_path(dir.path()).await.unwrap();

    assert_eq!(report.total(), 2);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["text of a.pdf".to_string(), "text of b.pdf".to_string()]
    );
    assert!(dir.path().join("a.xml").exists());
    assert!(dir.path().join("b.xml").exists());
    assert!(!dir.path().join("c.xml").exists());
    assert!(!pipeline.error_log().path().exists(), "nothing failed, nothing logged");
}

#[tokio::test]
async fn failure_in_one_file_does_not_stop_the_batch() {
    let dir = invoice_dir(&["a.pdf", "b.pdf"]);
    let log = log_in(&dir);
    let pipeline = Pipeline::new(
        FakeExtractor {
            failing: vec!["a.pdf"],
        },
        FakeGenerator::new("<b/>"),
        log.clone(),
    );

    let report = pipeline.convert_path(dir.path()).await.unwrap();

    assert_eq!(report.total(), 2);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.files[0].error(),
        Some(FileError::Extraction { .. })
    ));
    assert!(report.files[1].is_success());
    assert!(!dir.path().join("a.xml").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("b.xml")).unwrap(),
        "<b/>"
    );

    let lines = log_lines(&log);
    assert_eq!(lines.len(), 1, "{lines:?}");
    assert!(lines[0].contains("a.pdf"));
    assert!(lines[0].contains("trailer not found"));
    assert!(lines[0].starts_with('['));

    // Per-file failures are not fatal unless the caller asks.
    assert!(matches!(
        report.into_result(),
        Err(Pdf2PohodaError::PartialFailure { failed: 1, total: 2, .. })
    ));
}

#[tokio::test]
async fn generation_failure_is_recorded_per_file() {
    let dir = invoice_dir(&["only.pdf"]);
    let log = log_in(&dir);
    let pipeline = Pipeline::new(FakeExtractor { failing: vec![] }, FailingGenerator, log.clone());

    let report = pipeline
        .convert_path(&dir.path().join("only.pdf"))
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.files[0].error(),
        Some(FileError::Generation { .. })
    ));
    assert!(log_lines(&log)[0].contains("503 Service Unavailable"));
}

#[tokio::test]
async fn second_run_overwrites_xml() {
    let dir = invoice_dir(&["name.pdf"]);
    let pdf = dir.path().join("name.pdf");

    let first = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<first/>"),
        log_in(&dir),
    );
    first.convert_path(&pdf).await.unwrap();

    let second = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<second/>"),
        log_in(&dir),
    );
    second.convert_path(&pdf).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("name.xml")).unwrap(),
        "<second/>"
    );
}

#[tokio::test]
async fn optional_stages_are_off_by_default() {
    let dir = invoice_dir(&["a.pdf"]);
    let pipeline = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<a/>"),
        log_in(&dir),
    );

    let report = pipeline.convert_path(dir.path()).await.unwrap();
    let out = report.files[0].output().unwrap();
    assert!(out.validation.is_none());
    assert!(out.submission.is_none());
    assert_eq!(out.xml_path, dir.path().join("a.xml"));
    assert_eq!(out.xml_len, 4);
}

#[tokio::test]
async fn valid_xml_is_submitted_with_agenda() {
    let dir = invoice_dir(&["a.pdf"]);
    let submitter = RecordingSubmitter::default();
    let calls = Arc::clone(&submitter.calls);
    let pipeline = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<a/>"),
        log_in(&dir),
    )
    .with_validator(FixedValidator(true))
    .with_submitter(submitter, endpoint());

    let report = pipeline.convert_path(dir.path()).await.unwrap();

    let out = report.files[0].output().unwrap();
    assert!(out.validation.as_ref().unwrap().valid);
    assert!(out.submission.as_ref().unwrap().success);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![("<a/>".to_string(), "12345678".to_string(), "a.pdf".to_string())]
    );
}

#[tokio::test]
async fn invalid_xml_is_written_but_not_submitted() {
    let dir = invoice_dir(&["a.pdf"]);
    let submitter = RecordingSubmitter::default();
    let calls = Arc::clone(&submitter.calls);
    let pipeline = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<a/>"),
        log_in(&dir),
    )
    .with_validator(FixedValidator(false))
    .with_submitter(submitter, endpoint());

    let report = pipeline.convert_path(dir.path()).await.unwrap();

    // Validation outcome is reported, the file itself still counts as converted.
    assert!(report.files[0].is_success());
    let out = report.files[0].output().unwrap();
    assert!(!out.validation.as_ref().unwrap().valid);
    assert!(out.submission.is_none());
    assert!(calls.lock().unwrap().is_empty());
    assert!(dir.path().join("a.xml").exists());
}

#[tokio::test]
async fn progress_events_follow_processing_order() {
    let dir = invoice_dir(&["a.pdf", "b.pdf"]);
    let progress = Arc::new(RecordingProgress::default());
    let pipeline = Pipeline::new(
        FakeExtractor {
            failing: vec!["b.pdf"],
        },
        FakeGenerator::new("<a/>"),
        log_in(&dir),
    )
    .with_progress(progress.clone());

    pipeline.convert_path(dir.path()).await.unwrap();

    assert_eq!(
        *progress.events.lock().unwrap(),
        vec!["start 2", "ok 0", "err 1", "done 1/2"]
    );
}

#[tokio::test]
async fn empty_directory_is_a_usage_error_and_logs_nothing() {
    let dir = invoice_dir(&["notes.txt"]);
    let log = log_in(&dir);
    let pipeline = Pipeline::new(
        FakeExtractor { failing: vec![] },
        FakeGenerator::new("<a/>"),
        log.clone(),
    );

    let err = pipeline.convert_path(dir.path()).await.unwrap_err();
    assert!(matches!(err, Pdf2PohodaError::NoPdfsInDirectory { .. }));
    assert!(!log.path().exists());
}

#[test]
fn missing_environment_fails_before_anything_runs() {
    let err = Settings::from_lookup(|_| None).unwrap_err();
    assert!(matches!(
        err,
        Pdf2PohodaError::MissingEnv {
            var: "OPENAI_API_KEY"
        }
    ));
}

#[test]
fn single_input_yields_one_pdf() {
    let input = pdf2pohoda::BatchInput::Single(PathBuf::from("in/a.pdf"));
    assert_eq!(input.pdfs(), &[PathBuf::from("in/a.pdf")]);
}
