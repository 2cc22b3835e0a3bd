//! Plain-text extraction for single documents, plus contact-field detection.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::intake::{DocumentBlob, DocumentKind, ExtractionError};

/// Text pulled out of one document. `warnings` are non-fatal oddities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub warnings: Vec<String>,
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, blob: &DocumentBlob) -> Result<ExtractedText, ExtractionError>;
}

/// PDF via `pdf-extract`, `.txt` as lossy UTF-8.
pub struct DocumentTextExtractor;

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(&self, blob: &DocumentBlob) -> Result<ExtractedText, ExtractionError> {
        match blob.kind() {
            DocumentKind::Pdf => extract_pdf(blob).await,
            DocumentKind::PlainText => Ok(decode_plain_text(blob)),
            DocumentKind::Zip | DocumentKind::Unsupported => {
                Err(ExtractionError::Unsupported(blob.file_name.clone()))
            }
        }
    }
}

async fn extract_pdf(blob: &DocumentBlob) -> Result<ExtractedText, ExtractionError> {
    let bytes = blob.bytes.clone();
    let file_name = blob.file_name.clone();

    // pdf-extract can panic on malformed input; a panic surfaces as a JoinError.
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| ExtractionError::Task {
            file_name: file_name.clone(),
            reason: e.to_string(),
        })?;

    let text = result.map_err(|e| ExtractionError::Pdf {
        file_name,
        reason: e.to_string(),
    })?;

    Ok(ExtractedText {
        text,
        warnings: Vec::new(),
    })
}

fn decode_plain_text(blob: &DocumentBlob) -> ExtractedText {
    match std::str::from_utf8(&blob.bytes) {
        Ok(text) => ExtractedText {
            text: text.to_string(),
            warnings: Vec::new(),
        },
        Err(_) => ExtractedText {
            text: String::from_utf8_lossy(&blob.bytes).into_owned(),
            warnings: vec![format!(
                "'{}' is not valid UTF-8; invalid bytes were replaced",
                blob.file_name
            )],
        },
    }
}

/// First e-mail address and phone number found in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
    })
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"\+?\d[\d\s().-]{8,}\d").expect("valid phone regex"))
}

pub fn extract_contact_details(text: &str) -> ContactDetails {
    ContactDetails {
        email: email_pattern().find(text).map(|m| m.as_str().to_string()),
        phone: phone_pattern()
            .find(text)
            .map(|m| m.as_str().trim().to_string()),
    }
}
