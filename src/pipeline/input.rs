//! Input resolution: turn the user-supplied path into a list of PDFs.
//!
//! Two shapes are accepted: a single file with a `.pdf` extension, or a
//! directory whose immediate children include such files. Anything else is
//! a usage error. The extension check is case-insensitive, so `SCAN.PDF`
//! counts.

use crate::error::Pdf2PohodaError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The resolved input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInput {
    /// A single PDF file.
    Single(PathBuf),
    /// A directory and the PDFs found directly inside it, sorted by name.
    Directory { dir: PathBuf, pdfs: Vec<PathBuf> },
}

impl BatchInput {
    /// The PDFs to process, in processing order.
    pub fn pdfs(&self) -> &[PathBuf] {
        match self {
            BatchInput::Single(p) => std::slice::from_ref(p),
            BatchInput::Directory { pdfs, .. } => pdfs,
        }
    }
}

/// Does `path` end in `.pdf`, ignoring case?
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Resolve `path` into a [`BatchInput`].
pub fn resolve_input(path: &Path) -> Result<BatchInput, Pdf2PohodaError> {
    if !path.exists() {
        return Err(Pdf2PohodaError::PathNotFound {
            path: path.to_path_buf(),
        });
    }

    if path.is_file() {
        if !has_pdf_extension(path) {
            return Err(Pdf2PohodaError::NotAPdf {
                path: path.to_path_buf(),
            });
        }
        debug!("Resolved single PDF: {}", path.display());
        return Ok(BatchInput::Single(path.to_path_buf()));
    }

    if path.is_dir() {
        let pdfs = list_pdfs(path)?;
        if pdfs.is_empty() {
            return Err(Pdf2PohodaError::NoPdfsInDirectory {
                dir: path.to_path_buf(),
            });
        }
        debug!("Resolved {} PDFs in {}", pdfs.len(), path.display());
        return Ok(BatchInput::Directory {
            dir: path.to_path_buf(),
            pdfs,
        });
    }

    Err(Pdf2PohodaError::NotAFileOrDirectory {
        path: path.to_path_buf(),
    })
}

/// Regular files directly inside `dir` with a `.pdf` extension, by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, Pdf2PohodaError> {
    let read_err = |source| Pdf2PohodaError::DirectoryReadFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && has_pdf_extension(&path) {
            pdfs.push(path);
        }
    }
    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pdfs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"%PDF-1.4").unwrap();
        p
    }

    #[test]
    fn extension_check_ignores_case() {
        assert!(has_pdf_extension(Path::new("a.pdf")));
        assert!(has_pdf_extension(Path::new("dir/B.PDF")));
        assert!(!has_pdf_extension(Path::new("c.txt")));
        assert!(!has_pdf_extension(Path::new("pdf")));
        assert!(!has_pdf_extension(Path::new("archive.pdf.zip")));
    }

    #[test]
    fn single_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = touch(dir.path(), "invoice.PDF");
        assert_eq!(resolve_input(&p).unwrap(), BatchInput::Single(p));
    }

    #[test]
    fn single_file_with_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let p = touch(dir.path(), "notes.txt");
        assert!(matches!(
            resolve_input(&p),
            Err(Pdf2PohodaError::NotAPdf { .. })
        ));
    }

    #[test]
    fn missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            resolve_input(&dir.path().join("gone.pdf")),
            Err(Pdf2PohodaError::PathNotFound { .. })
        ));
    }

    #[test]
    fn directory_lists_only_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "b.pdf");
        touch(dir.path(), "c.txt");
        let a = touch(dir.path(), "a.pdf");
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let input = resolve_input(dir.path()).unwrap();
        assert_eq!(input.pdfs(), &[a, b]);
    }

    #[test]
    fn directory_without_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "c.txt");
        assert!(matches!(
            resolve_input(dir.path()),
            Err(Pdf2PohodaError::NoPdfsInDirectory { .. })
        ));
    }
}
