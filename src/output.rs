//! Result types returned by the batch driver.

use crate::error::{FileError, Pdf2PohodaError};
use crate::pipeline::submit::SubmissionOutcome;
use crate::pipeline::validate::ValidationOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a successful per-file pipeline produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutput {
    pub xml_path: PathBuf,
    /// Byte length of the written XML.
    pub xml_len: usize,
    /// `None` when validation is disabled.
    pub validation: Option<ValidationOutcome>,
    /// `None` when submission is disabled or skipped.
    pub submission: Option<SubmissionOutcome>,
}

impl FileOutput {
    /// Validation failed or the submission was rejected. Both end up in the
    /// error log only.
    pub fn needs_attention(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| !v.valid)
            || self.submission.as_ref().is_some_and(|s| !s.success)
    }
}

/// Outcome of one PDF in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub pdf_path: PathBuf,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub result: FileResult,
}

/// Success-or-failure payload of a [`FileOutcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileResult {
    Converted(FileOutput),
    Failed { error: FileError },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.result, FileResult::Converted(_))
    }

    pub fn output(&self) -> Option<&FileOutput> {
        match &self.result {
            FileResult::Converted(o) => Some(o),
            FileResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&FileError> {
        match &self.result {
            FileResult::Converted(_) => None,
            FileResult::Failed { error } => Some(error),
        }
    }
}

/// Everything a batch run produced, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
    pub total_duration_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Converted files whose validation or submission went wrong.
    pub fn needs_attention(&self) -> usize {
        self.files
            .iter()
            .filter_map(FileOutcome::output)
            .filter(|o| o.needs_attention())
            .count()
    }

    /// Turn any per-file failure into [`Pdf2PohodaError::PartialFailure`].
    pub fn into_result(self) -> Result<Self, Pdf2PohodaError> {
        let failed = self.failed();
        if failed == 0 {
            Ok(self)
        } else {
            Err(Pdf2PohodaError::PartialFailure {
                success: self.succeeded(),
                failed,
                total: self.total(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(name: &str) -> FileOutcome {
        FileOutcome {
            pdf_path: PathBuf::from(format!("{name}.pdf")),
            duration_ms: 1,
            result: FileResult::Converted(FileOutput {
                xml_path: PathBuf::from(format!("{name}.xml")),
                xml_len: 4,
                validation: None,
                submission: None,
            }),
        }
    }

    fn failed(name: &str) -> FileOutcome {
        FileOutcome {
            pdf_path: PathBuf::from(format!("{name}.pdf")),
            duration_ms: 1,
            result: FileResult::Failed {
                error: FileError::Extraction {
                    file: PathBuf::from(format!("{name}.pdf")),
                    detail: "boom".into(),
                },
            },
        }
    }

    #[test]
    fn counts_and_into_result() {
        let report = BatchReport {
            files: vec![failed("a"), converted("b")],
            total_duration_ms: 2,
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.into_result(),
            Err(Pdf2PohodaError::PartialFailure {
                success: 1,
                failed: 1,
                total: 2
            })
        ));

        let clean = BatchReport {
            files: vec![converted("c")],
            total_duration_ms: 1,
        };
        assert!(clean.into_result().is_ok());
    }

    #[test]
    fn failed_validation_or_submission_needs_attention() {
        let mut rejected = converted("r");
        if let FileResult::Converted(out) = &mut rejected.result {
            out.submission = Some(SubmissionOutcome {
                success: false,
                status: Some(500),
                detail: Some("boom".into()),
            });
        }
        let mut invalid = converted("i");
        if let FileResult::Converted(out) = &mut invalid.result {
            out.validation = Some(ValidationOutcome {
                valid: false,
                errors: vec!["bad".into()],
            });
        }
        let report = BatchReport {
            files: vec![converted("ok"), rejected, invalid, failed("f")],
            total_duration_ms: 4,
        };
        assert_eq!(report.needs_attention(), 2);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn json_tags_status() {
        let json = serde_json::to_value(failed("a")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["pdf_path"], "a.pdf");

        let json = serde_json::to_value(converted("b")).unwrap();
        assert_eq!(json["status"], "converted");
        assert_eq!(json["xml_path"], "b.xml");
    }
}
