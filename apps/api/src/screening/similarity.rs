//! Phase 1: similarity funnel.
//!
//! Embeds the job text and every candidate, ranks candidates by cosine similarity
//! (stable: ties keep discovery order) and keeps the first K1.
//!
//! Embedding-failure policy: a candidate whose embedding cannot be computed or
//! compared stays in the batch with `similarity = None` and ranks after every
//! scored candidate. It is never dropped silently. Only a failure to embed the
//! job text aborts the phase.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::screening::embedding::{EmbeddingEncoder, EmbeddingError, EmbeddingSink};
use crate::screening::models::{CandidateDocument, ScoredCandidate};

/// Cosine similarity in [-1, 1]. `None` when the vectors are not comparable.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let score = dot / denom;
    score.is_finite().then(|| score.clamp(-1.0, 1.0))
}

/// Descending by similarity, unscored last. `sort_by` is stable, so equal keys keep
/// the incoming (discovery) order.
pub fn rank_by_similarity(mut scored: Vec<ScoredCandidate>, width: usize) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| match (a.similarity, b.similarity) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    scored.truncate(width);
    scored
}

/// Phase-1 result: the full scored batch and the K1 survivors.
#[derive(Debug, Clone)]
pub struct Shortlist {
    pub survivors: Vec<ScoredCandidate>,
    pub scored: usize,
    pub unscored: usize,
}

pub struct SimilarityFunnel {
    encoder: Arc<dyn EmbeddingEncoder>,
    sink: Arc<dyn EmbeddingSink>,
    concurrency: usize,
}

impl SimilarityFunnel {
    pub fn new(
        encoder: Arc<dyn EmbeddingEncoder>,
        sink: Arc<dyn EmbeddingSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            encoder,
            sink,
            concurrency: concurrency.max(1),
        }
    }

    /// Scores every document against `job_text` and keeps the top `width`.
    /// `documents` must be in discovery order.
    pub async fn shortlist(
        &self,
        job_text: &str,
        documents: &[CandidateDocument],
        width: usize,
    ) -> Result<Shortlist, EmbeddingError> {
        let job_vector = self.encoder.encode(job_text).await?;
        if cosine_similarity(&job_vector, &job_vector).is_none() {
            return Err(EmbeddingError::Degenerate);
        }

        // buffered() yields in input order, so the scored list stays in discovery order.
        // Owned items keep the future Send for the axum handler.
        let job_vector = job_vector.as_slice();
        let scored: Vec<ScoredCandidate> = stream::iter(documents.iter().cloned())
            .map(|document| async move {
                let similarity = self.score_document(job_vector, &document).await;
                ScoredCandidate {
                    document,
                    similarity,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let unscored = scored.iter().filter(|c| c.similarity.is_none()).count();
        let total = scored.len();
        Ok(Shortlist {
            survivors: rank_by_similarity(scored, width),
            scored: total - unscored,
            unscored,
        })
    }

    async fn score_document(&self, job_vector: &[f32], document: &CandidateDocument) -> Option<f64> {
        let vector = match self.encoder.encode(&document.text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(candidate_id = %document.id, file = %document.file_name, error = %e,
                    "embedding failed; candidate ranks last");
                return None;
            }
        };

        let similarity = cosine_similarity(job_vector, &vector);
        if similarity.is_none() {
            let error = if vector.len() != job_vector.len() {
                EmbeddingError::DimensionMismatch {
                    expected: job_vector.len(),
                    actual: vector.len(),
                }
            } else {
                EmbeddingError::Degenerate
            };
            warn!(candidate_id = %document.id, file = %document.file_name, error = %error,
                "embedding not comparable; candidate ranks last");
            return None;
        }

        if let Err(e) = self.sink.store(document.id, &vector).await {
            warn!(candidate_id = %document.id, error = %e, "failed to persist embedding");
        }
        similarity
    }
}
