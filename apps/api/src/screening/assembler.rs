//! Run assembly. Pure: merges every phase's output into one immutable run record.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::intake::IntakeReport;
use crate::screening::models::{
    AnalyzedCandidate, FinalistRecord, IngestedEntry, JobPosting, RunBundle, RunProvenance,
    ScoredCandidate, ScreeningRun, ShortlistEntry,
};
use crate::settings::FunnelSettings;

/// Everything the funnel produced for one request.
#[derive(Debug)]
pub struct RunParts {
    pub user_id: Uuid,
    pub batch_id: Uuid,
    pub job: JobPosting,
    pub settings: FunnelSettings,
    pub run_start_time: DateTime<Utc>,
    pub run_end_time: DateTime<Utc>,
    pub intake: IntakeReport,
    pub shortlist: Vec<ScoredCandidate>,
    pub finalists: Vec<AnalyzedCandidate>,
}

impl FinalistRecord {
    pub fn from_analyzed(candidate: AnalyzedCandidate) -> Self {
        let AnalyzedCandidate {
            scored,
            name,
            assessment,
            ..
        } = candidate;
        let document = scored.document;

        Self {
            id: document.id,
            name,
            file_name: document.file_name,
            fit_score: assessment.fit_score,
            similarity_score: scored.similarity,
            skill_breakdown: assessment.skills,
            education_highlights: assessment.education_highlights,
            experience_highlights: assessment.experience_highlights,
            summary: assessment.summary,
            justification: assessment.justification,
            gaps: assessment.gaps,
            email: document.email,
            phone: document.phone,
            raw_text: document.text,
            extraction_status: assessment.status,
            questions_generated: false,
            generated_questions: Vec::new(),
        }
    }
}

/// Builds the run and the documents to persist with it. Finalist order is kept.
pub fn assemble_run(parts: RunParts) -> RunBundle {
    let RunParts {
        user_id,
        batch_id,
        job,
        settings,
        run_start_time,
        run_end_time,
        intake,
        shortlist,
        finalists,
    } = parts;

    let provenance = RunProvenance {
        ingested: intake
            .documents
            .iter()
            .map(|d| IngestedEntry {
                candidate_id: d.id,
                file_name: d.file_name.clone(),
            })
            .collect(),
        shortlisted: shortlist
            .iter()
            .map(|c| ShortlistEntry {
                candidate_id: c.document.id,
                similarity: c.similarity,
            })
            .collect(),
        finalists: finalists.iter().map(|c| c.scored.document.id).collect(),
        intake_warnings: intake.warnings,
    };

    let run = ScreeningRun {
        id: Uuid::new_v4(),
        user_id,
        job_id: job.id,
        job_role: job.role.clone(),
        batch_id,
        run_start_time,
        run_end_time,
        settings,
        provenance,
        candidates: finalists
            .into_iter()
            .map(FinalistRecord::from_analyzed)
            .collect(),
    };

    RunBundle {
        job,
        documents: intake.documents,
        run,
    }
}
