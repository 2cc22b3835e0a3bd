//! Archive listing. One call expands one level; the normalizer drives recursion.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use tracing::warn;
use zip::ZipArchive;

use crate::intake::{DocumentBlob, DocumentKind, ExtractionError};

/// Lists the entries of an archive that are documents or nested archives,
/// in archive listing order. Directories and everything else are ignored.
#[async_trait]
pub trait ArchiveExpander: Send + Sync {
    async fn expand(&self, archive: &DocumentBlob) -> Result<Vec<DocumentBlob>, ExtractionError>;
}

pub struct ZipArchiveExpander {
    max_entry_bytes: usize,
}

impl ZipArchiveExpander {
    pub fn new(max_entry_bytes: usize) -> Self {
        Self { max_entry_bytes }
    }
}

#[async_trait]
impl ArchiveExpander for ZipArchiveExpander {
    async fn expand(&self, archive: &DocumentBlob) -> Result<Vec<DocumentBlob>, ExtractionError> {
        let bytes = archive.bytes.clone();
        let file_name = archive.file_name.clone();
        let max_entry_bytes = self.max_entry_bytes;

        tokio::task::spawn_blocking(move || read_zip_entries(&file_name, bytes, max_entry_bytes))
            .await
            .map_err(|e| ExtractionError::Task {
                file_name: archive.file_name.clone(),
                reason: e.to_string(),
            })?
    }
}

fn read_zip_entries(
    file_name: &str,
    bytes: bytes::Bytes,
    max_entry_bytes: usize,
) -> Result<Vec<DocumentBlob>, ExtractionError> {
    let archive_error = |reason: String| ExtractionError::Archive {
        file_name: file_name.to_string(),
        reason,
    };

    let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(|e| archive_error(e.to_string()))?;
    let mut entries = Vec::new();

    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                // encrypted or damaged entries are skipped, not fatal
                warn!(archive = file_name, index, error = %e, "skipping unreadable archive entry");
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if is_platform_metadata(&name) {
            continue;
        }
        let kind = DocumentKind::from_file_name(&name);
        if !(kind.is_document() || kind == DocumentKind::Zip) {
            continue;
        }
        if entry.size() > max_entry_bytes as u64 {
            warn!(
                archive = file_name,
                entry = %name,
                size = entry.size(),
                limit = max_entry_bytes,
                "skipping oversized archive entry"
            );
            continue;
        }

        // The declared size is untrusted; cap what the decompressor may produce.
        let limit = max_entry_bytes as u64;
        let mut buf = Vec::with_capacity(entry.size().min(limit) as usize);
        if let Err(e) = entry.by_ref().take(limit + 1).read_to_end(&mut buf) {
            warn!(archive = file_name, entry = %name, error = %e, "skipping unreadable archive entry");
            continue;
        }
        if buf.len() > max_entry_bytes {
            warn!(
                archive = file_name,
                entry = %name,
                declared = entry.size(),
                limit = max_entry_bytes,
                "skipping archive entry that inflates past its declared size"
            );
            continue;
        }
        entries.push(DocumentBlob::new(name, buf));
    }

    Ok(entries)
}

/// macOS resource forks (`__MACOSX/._cv.pdf`) look like documents but are not.
fn is_platform_metadata(name: &str) -> bool {
    name.starts_with("__MACOSX/")
        || name
            .rsplit('/')
            .next()
            .map(|base| base.starts_with("._"))
            .unwrap_or(false)
}
