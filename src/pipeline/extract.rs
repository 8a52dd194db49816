//! Text extraction: pull the text layer out of a PDF via pdfium.
//!
//! Invoices produced by accounting software carry a real text layer, so no
//! rasterisation or OCR is involved; pdfium's per-page text API is enough.
//! Pages whose text comes back empty (scans, blank separators) are dropped.

use crate::error::Pdf2PohodaError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything that can turn a PDF on disk into plain text.
pub trait TextExtractor {
    /// Extract the concatenated text of every page of `pdf`.
    fn extract_text(&self, pdf: &Path) -> Result<String, Pdf2PohodaError>;
}

/// [`TextExtractor`] backed by the pdfium library.
///
/// The library is bound once in [`PdfiumExtractor::new`] and reused for every
/// document in the batch.
pub struct PdfiumExtractor {
    pdfium: Pdfium,
}

impl PdfiumExtractor {
    /// Bind pdfium from `lib_dir` if given, otherwise from the system.
    pub fn new(lib_dir: Option<&Path>) -> Result<Self, Pdf2PohodaError> {
        let bindings = match lib_dir {
            Some(dir) => {
                let lib: PathBuf = Pdfium::pdfium_platform_library_name_at_path(dir);
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Pdf2PohodaError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_text(&self, pdf: &Path) -> Result<String, Pdf2PohodaError> {
        let document =
            self.pdfium
                .load_pdf_from_file(pdf, None)
                .map_err(|e| Pdf2PohodaError::CorruptPdf {
                    path: pdf.to_path_buf(),
                    detail: format!("{e:?}"),
                })?;

        let mut texts = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| Pdf2PohodaError::CorruptPdf {
                path: pdf.to_path_buf(),
                detail: format!("page {}: {e:?}", idx + 1),
            })?;
            texts.push(text.all());
        }

        debug!("Extracted text from {} pages of {}", texts.len(), pdf.display());
        Ok(join_page_texts(texts))
    }
}

/// Join per-page texts with `\n`, skipping pages that yielded nothing.
pub fn join_page_texts<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .filter(|p| !p.as_ref().is_empty())
        .map(|p| p.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
