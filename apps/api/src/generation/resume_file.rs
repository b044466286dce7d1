//! Text extraction for uploaded resume files.

use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;

/// Upper bound on an uploaded resume.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    PlainText,
}

impl ResumeFormat {
    /// Detects the format from the declared content type, then the file name,
    /// then the PDF magic bytes.
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>, data: &[u8]) -> Option<Self> {
        match content_type {
            Some("application/pdf") => return Some(ResumeFormat::Pdf),
            Some(ct) if ct.starts_with("text/") => return Some(ResumeFormat::PlainText),
            _ => {}
        }
        let lower = file_name.map(str::to_ascii_lowercase);
        match lower.as_deref() {
            Some(name) if name.ends_with(".pdf") => Some(ResumeFormat::Pdf),
            Some(name) if name.ends_with(".txt") || name.ends_with(".md") => {
                Some(ResumeFormat::PlainText)
            }
            _ if data.starts_with(b"%PDF-") => Some(ResumeFormat::Pdf),
            _ => None,
        }
    }
}

/// Extracts plain text from an uploaded resume.
pub async fn extract_resume_text(format: ResumeFormat, data: Bytes) -> Result<String, AppError> {
    if data.len() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(format!(
            "resume file exceeds {} bytes",
            MAX_RESUME_BYTES
        )));
    }

    let text = match format {
        ResumeFormat::PlainText => String::from_utf8(data.to_vec())
            .map_err(|_| AppError::Validation("resume text is not valid UTF-8".to_string()))?,
        ResumeFormat::Pdf => {
            // PDF parsing is CPU-bound.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
                .await
                .map_err(|e| AppError::Internal(e.into()))?
                .map_err(|e| AppError::Validation(format!("could not read PDF: {e}")))?
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation(
            "no text could be extracted from the resume".to_string(),
        ));
    }
    info!("Extracted {} chars of resume text ({:?})", text.len(), format);
    Ok(text)
}
