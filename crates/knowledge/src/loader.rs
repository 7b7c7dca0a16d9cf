//! Source document loading and page extraction.

use crate::types::Document;
use insight_core::{AppError, AppResult};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Page separator used by `pdftotext` and honoured in plain text files.
pub const PAGE_BREAK: char = '\u{c}';

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    PlainText,
    Pdf,
}

impl SourceFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" | "md" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Pdf => "pdf",
        }
    }
}

/// Load a document and split it into ordered pages.
pub fn load_document(path: &Path) -> AppResult<Document> {
    if !path.is_file() {
        return Err(load_error(path, "file not found"));
    }

    let format = SourceFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        load_error(
            path,
            format!("unsupported format '{}' (expected .pdf, .txt, .text or .md)", ext),
        )
    })?;

    tracing::debug!(path = ?path, format = format.as_str(), "Loading document");

    let text = match format {
        SourceFormat::PlainText => read_text(path)?,
        SourceFormat::Pdf => extract_pdf_text(path)?,
    };

    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let document = Document::from_pages(source, split_pages(&text));

    tracing::info!(
        "Loaded {} page(s) from {:?}",
        document.page_count(),
        path
    );

    Ok(document)
}

/// Split extracted text on form feeds, dropping the empty tail that
/// follows a final page break.
pub fn split_pages(text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

fn read_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e.to_string()))?;

    if bytes.contains(&0) {
        return Err(load_error(path, "binary content is not supported"));
    }

    String::from_utf8(bytes).map_err(|e| load_error(path, format!("not valid UTF-8: {}", e)))
}

/// Extract text with poppler's `pdftotext`, which separates pages with
/// form feeds.
fn extract_pdf_text(path: &Path) -> AppResult<String> {
    tracing::info!("Extracting PDF text using pdftotext");

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| {
            load_error(
                path,
                format!("could not run pdftotext: {} (is poppler installed?)", e),
            )
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(load_error(
            path,
            format!("pdftotext failed: {}", stderr.trim()),
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.trim().is_empty() {
        tracing::warn!("pdftotext extracted 0 characters");
        return Err(load_error(path, "PDF contains no extractable text"));
    }

    tracing::debug!("pdftotext extracted {} characters", text.chars().count());
    Ok(text)
}

fn load_error(path: &Path, message: impl Into<String>) -> AppError {
    AppError::Load {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SourceFormat::from_path(Path::new("ipc.PDF")),
            Some(SourceFormat::Pdf)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("notes.md")),
            Some(SourceFormat::PlainText)
        );
        assert_eq!(SourceFormat::from_path(Path::new("image.png")), None);
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_text_without_form_feed_is_one_page() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "act.txt", b"Section 1. Short title.\nSection 2. Extent.");

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.source(), "act.txt");
        assert_eq!(doc.pages()[0].number, 1);
    }

    #[test]
    fn test_form_feeds_split_pages() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ipc.txt", "one\u{c}\u{c}three\u{c}".as_bytes());

        let doc = load_document(&path).unwrap();
        let numbers: Vec<u32> = doc.pages().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(doc.pages()[1].text, "");
        assert_eq!(doc.pages()[2].text, "three");
    }

    #[test]
    fn test_split_pages_keeps_single_empty_page() {
        assert_eq!(split_pages(""), vec![""]);
        assert_eq!(split_pages("a\u{c}b\u{c}\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_document(Path::new("/nonexistent/ipc.pdf")).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ipc.docx", b"whatever");

        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported format 'docx'"));
    }

    #[test]
    fn test_binary_text_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blob.txt", b"abc\0def");

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "latin1.txt", &[0x53, 0x65, 0x63, 0xe9, 0xff]);

        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_garbage_pdf_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.pdf", b"definitely not a pdf");

        // Fails whether or not poppler is installed
        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
    }
}
