// src/documents/reader.rs
use crate::utils::error::SourceError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Anything that can recover plain text from a document on disk.
///
/// Implementations never fail: a document whose text cannot be recovered
/// yields an empty string, and the reason is logged by the source itself.
pub trait TextSource: Send + Sync {
    /// Lowercase file extensions (without the dot) this source can read.
    fn extensions(&self) -> &[&'static str];

    /// Text of the whole document, pages in order, joined by line breaks.
    fn extract_text(&self, path: &Path) -> String;

    /// Whether the file's extension is one of [`TextSource::extensions`], ignoring case.
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions().iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }
}

/// Recovers the text layer of PDF files with `pdf-extract`, page by page.
/// Scanned, image-only pages come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextSource;

impl PdfTextSource {
    pub fn new() -> Self {
        Self
    }

    fn read_pages(&self, path: &Path) -> Result<String, SourceError> {
        let bytes = std::fs::read(path)?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

        // pdf-extract (and the font parsers under it) can panic on malformed glyph data.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        }))
        .map_err(|payload| SourceError::Panicked(panic_message(payload.as_ref())))?
        .map_err(|e| SourceError::Pdf(e.to_string()))?;

        let mut text = String::new();
        for page in pages.iter().filter(|page| !page.is_empty()) {
            text.push_str(page);
            text.push('\n');
        }

        tracing::debug!("Recovered {} chars from {} pages of {}", text.len(), pages.len(), path.display());
        Ok(text)
    }
}

impl TextSource for PdfTextSource {
    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn extract_text(&self, path: &Path) -> String {
        match self.read_pages(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Lists the files directly inside `dir` that `source` can read, sorted by
/// name so that runs over the same folder are reproducible.
pub async fn list_documents(dir: &Path, source: &dyn TextSource) -> Result<Vec<PathBuf>, SourceError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut documents = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            tracing::trace!("Skipping non-file entry {}", path.display());
            continue;
        }
        if source.accepts(&path) {
            documents.push(path);
        } else {
            tracing::debug!("Skipping unsupported file {}", path.display());
        }
    }

    documents.sort();
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pdf_source_accepts_extension_case_insensitively() {
        let source = PdfTextSource::new();
        assert!(source.accepts(Path::new("a/contract.pdf")));
        assert!(source.accepts(Path::new("CONTRACT.PDF")));
        assert!(!source.accepts(Path::new("contract.pdf.txt")));
        assert!(!source.accepts(Path::new("README")));
    }

    #[test]
    fn test_unreadable_pdf_yields_empty_text() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.pdf");
        fs::write(&broken, b"definitely not a pdf").unwrap();

        let source = PdfTextSource::new();
        assert_eq!(source.extract_text(&broken), "");
        assert_eq!(source.extract_text(&dir.path().join("missing.pdf")), "");
    }

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), b"").unwrap();
        fs::write(dir.path().join("A.PDF"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let documents = tokio_test::block_on(list_documents(dir.path(), &PdfTextSource::new())).unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["A.PDF", "b.pdf"]);
    }
}
