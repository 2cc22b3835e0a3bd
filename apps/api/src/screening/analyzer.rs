//! Phase 2: detail analyzer.
//!
//! For every shortlisted candidate the name extraction and the fit assessment run
//! concurrently; candidates are fanned out with a bounded `buffer_unordered` and
//! each result lands in the slot of its shortlist position. A failed or invalid
//! assessment becomes `DetailedAssessment::fallback()` for that candidate only.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::llm_client::LlmError;
use crate::screening::assessor::{FitAssessment, LanguageModelService};
use crate::screening::models::{
    AnalyzedCandidate, DetailedAssessment, ExtractionStatus, ScoredCandidate, SkillBreakdown,
};

const MAX_NAME_CHARS: usize = 80;
const UNKNOWN_NAME: &str = "Unknown";

pub struct DetailAnalyzer {
    model: Arc<dyn LanguageModelService>,
    concurrency: usize,
}

impl DetailAnalyzer {
    pub fn new(model: Arc<dyn LanguageModelService>, concurrency: usize) -> Self {
        Self {
            model,
            concurrency: concurrency.max(1),
        }
    }

    /// Analyzes the shortlist. The output is in shortlist order and has one entry
    /// per input candidate.
    pub async fn analyze(
        &self,
        job_text: &str,
        shortlist: Vec<ScoredCandidate>,
    ) -> Vec<AnalyzedCandidate> {
        let mut slots: Vec<Option<AnalyzedCandidate>> = vec![None; shortlist.len()];

        let mut results = stream::iter(shortlist.into_iter().enumerate())
            .map(|(rank, scored)| async move {
                let analyzed = self.analyze_one(job_text, rank, scored).await;
                (rank, analyzed)
            })
            .buffer_unordered(self.concurrency);

        while let Some((rank, analyzed)) = results.next().await {
            slots[rank] = Some(analyzed);
        }

        slots.into_iter().flatten().collect()
    }

    async fn analyze_one(
        &self,
        job_text: &str,
        phase1_rank: usize,
        scored: ScoredCandidate,
    ) -> AnalyzedCandidate {
        let text = scored.document.text.as_str();
        let (name, assessment) = tokio::join!(
            self.model.extract_name(text),
            self.model.assess(job_text, text)
        );

        let name = match name {
            Ok(name) if !name.trim().is_empty() => truncate_name(name.trim()),
            Ok(_) => fallback_name(text),
            Err(e) => {
                warn!(candidate_id = %scored.document.id, error = %e, "name extraction failed");
                fallback_name(text)
            }
        };

        let assessment = match assessment.and_then(into_assessment) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(candidate_id = %scored.document.id, error = %e,
                    "assessment failed; using fallback record");
                DetailedAssessment::fallback()
            }
        };

        debug!(
            candidate_id = %scored.document.id,
            phase1_rank,
            fit_score = assessment.fit_score,
            "candidate analyzed"
        );

        AnalyzedCandidate {
            scored,
            phase1_rank,
            name,
            assessment,
        }
    }
}

/// Range-checks a parsed reply and maps it onto the stored assessment shape.
fn into_assessment(reply: FitAssessment) -> Result<DetailedAssessment, LlmError> {
    if !reply.fit_score.is_finite() || !(0.0..=100.0).contains(&reply.fit_score) {
        return Err(LlmError::Schema(format!(
            "fitScore {} is outside 0-100",
            reply.fit_score
        )));
    }

    Ok(DetailedAssessment {
        fit_score: reply.fit_score,
        summary: reply.summary,
        skills: SkillBreakdown {
            exact_matches: reply.technical_skills.exact_matches,
            transferable: reply.technical_skills.transferable,
            non_technical: reply.non_technical_skills,
        },
        experience_highlights: reply.experience_highlights,
        education_highlights: reply.education_highlights,
        justification: reply.justification,
        gaps: reply.gaps,
        status: ExtractionStatus::Ok,
    })
}

/// First non-empty line of the document, or "Unknown".
pub fn fallback_name(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(truncate_name)
        .unwrap_or_else(|| UNKNOWN_NAME.to_string())
}

fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

/// Keeps the top `width` by fit score. Stable sort over shortlist order, so ties
/// fall back to phase-1 rank.
pub fn select_finalists(
    mut analyzed: Vec<AnalyzedCandidate>,
    width: usize,
) -> Vec<AnalyzedCandidate> {
    analyzed.sort_by_key(|c| c.phase1_rank);
    analyzed.sort_by(|a, b| b.assessment.fit_score.total_cmp(&a.assessment.fit_score));
    analyzed.truncate(width);
    analyzed
}
