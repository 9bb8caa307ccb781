//! Text extraction for uploaded documents.
//!
//! Callers supply bytes plus a content type (from the HTTP `Content-Type`
//! header or the file extension); this module returns plain UTF-8 text.
//! Extraction never panics: malformed input becomes an [`ExtractError`]
//! and nothing is persisted.

use std::fmt::Display;
use std::panic::{self, UnwindSafe};
use std::path::Path;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("no text could be extracted")]
    NoText,
}

/// Guess a content type from a file name's extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        _ => None,
    }
}

/// Extract text from `bytes` of the given content type.
///
/// Parameters such as `; charset=utf-8` are ignored. Fails on empty input
/// and when the extracted text is blank.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::EmptyFile);
    }

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let text = match mime.as_str() {
        MIME_PDF => extract_pdf(bytes)?,
        MIME_TEXT | MIME_MARKDOWN => std::str::from_utf8(bytes)?.to_string(),
        _ => return Err(ExtractError::UnsupportedContentType(content_type.to_string())),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(text)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    run_pdf_extractor(|| pdf_extract::extract_text_from_mem(bytes))
}

/// Run a PDF extractor, turning both its errors and its panics into
/// [`ExtractError::Pdf`]. The PDF parser panics on some malformed files.
fn run_pdf_extractor<F, E>(extract: F) -> Result<String, ExtractError>
where
    F: FnOnce() -> Result<String, E> + UnwindSafe,
    E: Display,
{
    match panic::catch_unwind(extract) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "malformed document".to_string());
            tracing::warn!(reason = %reason, "PDF extractor panicked");
            Err(ExtractError::Pdf(format!("extractor panicked: {}", reason)))
        }
    }
}
