//! Text extraction from uploaded files

use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// File formats accepted for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
}

impl FileType {
    /// Detect the file type from its extension, falling back to the MIME guess
    pub fn detect(path: &Path) -> Option<Self> {
        let by_extension = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => Some(FileType::Pdf),
            Some("docx") => Some(FileType::Docx),
            Some("txt") | Some("text") | Some("md") => Some(FileType::Txt),
            _ => None,
        };
        by_extension.or_else(|| Self::from_mime(mime_guess::from_path(path).first_raw()?))
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("application/pdf") {
            Some(FileType::Pdf)
        } else if mime.contains("wordprocessingml.document") {
            Some(FileType::Docx)
        } else if mime.starts_with("text/") {
            Some(FileType::Txt)
        } else {
            None
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Txt => "txt",
        })
    }
}

/// Check for null bytes in the first 8KB
pub fn is_binary_content(data: &[u8]) -> bool {
    let check_len = std::cmp::min(data.len(), 8192);
    data[..check_len].contains(&0)
}

/// Extract plain text from `bytes`
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<String> {
    let raw = match file_type {
        FileType::Txt => extract_plain(bytes)?,
        FileType::Pdf => extract_pdf(bytes)?,
        FileType::Docx => {
            return Err(Error::Extraction(
                "docx files are not supported; convert the document to PDF or text".to_string(),
            ))
        }
    };

    let text = tidy_text(&raw)?;
    if text.is_empty() {
        return Err(Error::EmptyDocument);
    }
    debug!("Extracted {} characters from {} content", text.chars().count(), file_type);
    Ok(text)
}

/// Read and extract the file at `path`
pub fn extract_file(path: &Path) -> Result<String> {
    let file_type = FileType::detect(path).ok_or_else(|| {
        Error::Extraction(format!("unsupported file type: {}", path.display()))
    })?;
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, file_type)
}

fn extract_plain(bytes: &[u8]) -> Result<String> {
    if is_binary_content(bytes) {
        return Err(Error::Extraction(
            "file looks binary, not text".to_string(),
        ));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Extraction(format!("file is not valid UTF-8: {}", e)))
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("failed to read PDF: {}", e)))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String> {
    Err(Error::Extraction(
        "PDF support not compiled in; rebuild with --features pdf".to_string(),
    ))
}

/// Drop trailing spaces, collapse runs of blank lines, trim the ends
fn tidy_text(text: &str) -> Result<String> {
    let trailing = Regex::new(r"[ \t]+\r?\n").map_err(|e| Error::Other(e.to_string()))?;
    let blank_runs = Regex::new(r"\n{3,}").map_err(|e| Error::Other(e.to_string()))?;

    let text = text.replace("\r\n", "\n");
    let text = trailing.replace_all(&text, "\n");
    let text = blank_runs.replace_all(&text, "\n\n");
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::detect(Path::new("notes.TXT")), Some(FileType::Txt));
        assert_eq!(FileType::detect(Path::new("paper.pdf")), Some(FileType::Pdf));
        assert_eq!(FileType::detect(Path::new("essay.docx")), Some(FileType::Docx));
        assert_eq!(FileType::detect(Path::new("photo.png")), None);
        assert_eq!(FileType::from_mime("text/plain; charset=utf-8"), Some(FileType::Txt));
    }

    #[test]
    fn test_plain_text_is_tidied() {
        let text = extract_text(b"  Title  \r\n\r\n\r\n\r\nBody line   \nnext\n", FileType::Txt)
            .unwrap();
        assert_eq!(text, "Title\n\nBody line\nnext");
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            extract_text(&[0x48, 0x00, 0x49], FileType::Txt),
            Err(Error::Extraction(_))
        ));
        assert!(matches!(
            extract_text(&[0xff, 0xfe, 0x41], FileType::Txt),
            Err(Error::Extraction(_))
        ));
        assert!(matches!(
            extract_text(b"PK\x03\x04", FileType::Docx),
            Err(Error::Extraction(_))
        ));
        assert!(matches!(
            extract_text(b" \n\t ", FileType::Txt),
            Err(Error::EmptyDocument)
        ));
    }

    #[test]
    fn test_extract_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "Photosynthesis converts light.").unwrap();

        assert_eq!(extract_file(&path).unwrap(), "Photosynthesis converts light.");
        assert!(matches!(
            extract_file(&tmp.path().join("image.png")),
            Err(Error::Extraction(_))
        ));
    }
}
