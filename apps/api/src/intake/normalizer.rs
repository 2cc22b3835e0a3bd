//! Intake normalizer: expands uploads into an ordered list of candidate documents.
//!
//! Discovery order: entries of every archive (archives in upload order, entries in
//! listing order, nested archives expanded in place), followed by the stand-alone
//! documents in upload order. Documents that fail extraction or carry no text are
//! dropped with a warning and never reach the funnel.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::intake::blob_store::object_key;
use crate::intake::extractor::extract_contact_details;
use crate::intake::{ArchiveExpander, BlobStore, DocumentBlob, DocumentKind, TextExtractor};
use crate::screening::models::CandidateDocument;

/// Archives nested deeper than this are skipped.
pub const MAX_ARCHIVE_DEPTH: usize = 3;
const EXTRACTION_CONCURRENCY: usize = 4;
const UPLOAD_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("No files were uploaded")]
    NoUploads,

    #[error("Unsupported file '{0}': upload PDF, TXT or ZIP files")]
    UnsupportedUpload(String),

    #[error("'{file_name}' is {size} bytes; the limit is {limit}")]
    TooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },

    #[error("No valid documents found in the upload")]
    NoDocuments { warnings: Vec<String> },
}

/// Intake output: surviving documents in discovery order plus everything dropped.
/// `warnings` also carries non-fatal notes on kept documents, so it can outnumber `dropped`.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    pub documents: Vec<CandidateDocument>,
    pub warnings: Vec<String>,
    pub dropped: usize,
}

pub struct IntakeNormalizer {
    extractor: Arc<dyn TextExtractor>,
    archives: Arc<dyn ArchiveExpander>,
    blobs: Arc<dyn BlobStore>,
    max_document_bytes: usize,
}

impl IntakeNormalizer {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        archives: Arc<dyn ArchiveExpander>,
        blobs: Arc<dyn BlobStore>,
        max_document_bytes: usize,
    ) -> Self {
        Self {
            extractor,
            archives,
            blobs,
            max_document_bytes,
        }
    }

    pub async fn normalize(
        &self,
        batch_id: Uuid,
        uploads: Vec<DocumentBlob>,
    ) -> Result<IntakeReport, IntakeError> {
        if uploads.is_empty() {
            return Err(IntakeError::NoUploads);
        }
        for upload in &uploads {
            if upload.kind() == DocumentKind::Unsupported {
                return Err(IntakeError::UnsupportedUpload(upload.file_name.clone()));
            }
            if upload.kind().is_document() && upload.bytes.len() > self.max_document_bytes {
                return Err(IntakeError::TooLarge {
                    file_name: upload.file_name.clone(),
                    size: upload.bytes.len(),
                    limit: self.max_document_bytes,
                });
            }
        }

        let mut warnings = Vec::new();
        let mut dropped = 0usize;
        let (archives, standalone): (Vec<_>, Vec<_>) = uploads
            .into_iter()
            .partition(|upload| upload.kind() == DocumentKind::Zip);

        let mut resolved = Vec::new();
        for archive in archives {
            resolved.extend(self.expand_archive(archive, &mut warnings).await);
        }
        resolved.extend(standalone);

        let extracted: Vec<_> = stream::iter(resolved)
            .map(|blob| async move {
                let result = self.extractor.extract(&blob).await;
                (blob, result)
            })
            .buffered(EXTRACTION_CONCURRENCY)
            .collect()
            .await;

        let mut accepted: Vec<(CandidateDocument, DocumentBlob)> = Vec::new();
        for (blob, result) in extracted {
            let extracted = match result {
                Ok(extracted) => extracted,
                Err(e) => {
                    warn!(file = %blob.file_name, error = %e, "dropping document: extraction failed");
                    warnings.push(e.to_string());
                    dropped += 1;
                    continue;
                }
            };
            warnings.extend(extracted.warnings);

            if extracted.text.trim().is_empty() {
                warn!(file = %blob.file_name, "dropping document: no extractable text");
                warnings.push(format!("'{}' contains no extractable text", blob.file_name));
                dropped += 1;
                continue;
            }

            let contact = extract_contact_details(&extracted.text);
            let document = CandidateDocument {
                id: Uuid::new_v4(),
                file_name: blob.file_name.clone(),
                text: extracted.text,
                email: contact.email,
                phone: contact.phone,
                raw_ref: None,
                discovery_index: accepted.len(),
            };
            accepted.push((document, blob));
        }

        if accepted.is_empty() {
            return Err(IntakeError::NoDocuments { warnings });
        }

        let documents = self.store_raw_bytes(batch_id, accepted).await;
        info!(
            batch_id = %batch_id,
            documents = documents.len(),
            dropped,
            warnings = warnings.len(),
            "intake complete"
        );

        Ok(IntakeReport {
            documents,
            warnings,
            dropped,
        })
    }

    /// Depth-first expansion that keeps archive listing order.
    async fn expand_archive(
        &self,
        root: DocumentBlob,
        warnings: &mut Vec<String>,
    ) -> Vec<DocumentBlob> {
        let mut documents = Vec::new();
        let mut stack = vec![(root, 0usize)];

        while let Some((blob, depth)) = stack.pop() {
            match blob.kind() {
                DocumentKind::Zip => {
                    if depth >= MAX_ARCHIVE_DEPTH {
                        warn!(file = %blob.file_name, depth, "skipping archive nested too deeply");
                        warnings.push(format!(
                            "'{}' is nested more than {MAX_ARCHIVE_DEPTH} archives deep",
                            blob.file_name
                        ));
                        continue;
                    }
                    match self.archives.expand(&blob).await {
                        Ok(entries) => {
                            stack.extend(entries.into_iter().rev().map(|entry| (entry, depth + 1)))
                        }
                        Err(e) => {
                            warn!(file = %blob.file_name, error = %e, "skipping unreadable archive");
                            warnings.push(e.to_string());
                        }
                    }
                }
                kind if kind.is_document() => documents.push(blob),
                _ => debug!(file = %blob.file_name, "ignoring non-document archive entry"),
            }
        }

        documents
    }

    /// Uploads raw bytes; a failed upload leaves `raw_ref` empty and keeps the candidate.
    async fn store_raw_bytes(
        &self,
        batch_id: Uuid,
        accepted: Vec<(CandidateDocument, DocumentBlob)>,
    ) -> Vec<CandidateDocument> {
        stream::iter(accepted)
            .map(|(mut document, blob)| async move {
                let key = object_key(batch_id, document.id, &document.file_name);
                let content_type = blob.kind().content_type();
                match self.blobs.put(&key, blob.bytes, content_type).await {
                    Ok(reference) => document.raw_ref = Some(reference),
                    Err(e) => {
                        warn!(file = %document.file_name, error = %e, "raw document upload failed")
                    }
                }
                document
            })
            .buffered(UPLOAD_CONCURRENCY)
            .collect()
            .await
    }
}
