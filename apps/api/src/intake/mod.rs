// Intake: turns uploaded blobs (documents or archives) into candidate documents.
// PDF parsing and ZIP listing are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod archive;
pub mod blob_store;
pub mod extractor;
pub mod normalizer;

use bytes::Bytes;
use thiserror::Error;

pub use archive::{ArchiveExpander, ZipArchiveExpander};
pub use blob_store::{BlobStore, S3BlobStore};
pub use extractor::{DocumentTextExtractor, TextExtractor};
pub use normalizer::{IntakeError, IntakeNormalizer, IntakeReport};

/// One uploaded file, or one entry pulled out of an archive.
#[derive(Debug, Clone)]
pub struct DocumentBlob {
    pub file_name: String,
    pub bytes: Bytes,
}

impl DocumentBlob {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_file_name(&self.file_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Zip,
    Unsupported,
}

impl DocumentKind {
    /// Detection is by lowercase extension only.
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".pdf") {
            DocumentKind::Pdf
        } else if lower.ends_with(".txt") {
            DocumentKind::PlainText
        } else if lower.ends_with(".zip") {
            DocumentKind::Zip
        } else {
            DocumentKind::Unsupported
        }
    }

    pub fn is_document(self) -> bool {
        matches!(self, DocumentKind::Pdf | DocumentKind::PlainText)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::PlainText => "text/plain",
            DocumentKind::Zip => "application/zip",
            DocumentKind::Unsupported => "application/octet-stream",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not read PDF '{file_name}': {reason}")]
    Pdf { file_name: String, reason: String },

    #[error("could not read archive '{file_name}': {reason}")]
    Archive { file_name: String, reason: String },

    #[error("'{0}' is not a supported document type")]
    Unsupported(String),

    #[error("extraction task for '{file_name}' did not complete: {reason}")]
    Task { file_name: String, reason: String },
}
