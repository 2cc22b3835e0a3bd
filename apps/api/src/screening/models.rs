//! Domain records flowing through the screening funnel.
//!
//! `CandidateDocument` is produced by intake, `ScoredCandidate` by phase 1,
//! `AnalyzedCandidate` by phase 2 and `ScreeningRun` by the assembler.
//! Everything that is stored or returned to clients uses camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::settings::FunnelSettings;

/// Justification recorded on every fallback assessment.
pub const ANALYSIS_FAILED_MARKER: &str = "analysis failed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: Uuid,
    pub role: String,
    pub description: String,
}

/// One extracted document. Never mutated after intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDocument {
    pub id: Uuid,
    pub file_name: String,
    pub text: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Object-storage key of the uploaded bytes, when the upload succeeded.
    pub raw_ref: Option<String>,
    /// Position in intake discovery order; the phase-1 tie breaker.
    pub discovery_index: usize,
}

/// A candidate after phase 1. `similarity` is `None` when the embedding failed,
/// which ranks the candidate after every scored one.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub document: CandidateDocument,
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillBreakdown {
    pub exact_matches: Vec<String>,
    pub transferable: Vec<String>,
    pub non_technical: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAssessment {
    /// 0 – 100
    pub fit_score: f64,
    pub summary: String,
    pub skills: SkillBreakdown,
    pub experience_highlights: String,
    pub education_highlights: String,
    pub justification: String,
    pub gaps: Vec<String>,
    pub status: ExtractionStatus,
}

impl DetailedAssessment {
    /// The fixed record substituted when a remote assessment fails or is invalid.
    pub fn fallback() -> Self {
        Self {
            fit_score: 0.0,
            summary: String::new(),
            skills: SkillBreakdown::default(),
            experience_highlights: String::new(),
            education_highlights: String::new(),
            justification: ANALYSIS_FAILED_MARKER.to_string(),
            gaps: Vec::new(),
            status: ExtractionStatus::Fallback,
        }
    }
}

/// A shortlisted candidate after phase 2.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedCandidate {
    pub scored: ScoredCandidate,
    /// Zero-based position in the phase-1 shortlist; the phase-2 tie breaker.
    pub phase1_rank: usize,
    pub name: String,
    pub assessment: DetailedAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    pub skill_type: String,
    pub difficulty: String,
}

/// One finalist slot of a stored run, and the candidate shape returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalistRecord {
    pub id: Uuid,
    pub name: String,
    pub file_name: String,
    pub fit_score: f64,
    pub similarity_score: Option<f64>,
    pub skill_breakdown: SkillBreakdown,
    pub education_highlights: String,
    pub experience_highlights: String,
    pub summary: String,
    pub justification: String,
    pub gaps: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub raw_text: String,
    pub extraction_status: ExtractionStatus,
    /// Written later by question generation; always false at assembly time.
    #[serde(default)]
    pub questions_generated: bool,
    #[serde(default)]
    pub generated_questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedEntry {
    pub candidate_id: Uuid,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortlistEntry {
    pub candidate_id: Uuid,
    pub similarity: Option<f64>,
}

/// What happened at each funnel stage, in stage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProvenance {
    pub ingested: Vec<IngestedEntry>,
    pub shortlisted: Vec<ShortlistEntry>,
    pub finalists: Vec<Uuid>,
    /// Intake warnings, e.g. documents dropped for empty text.
    pub intake_warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningRun {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub job_role: String,
    pub batch_id: Uuid,
    pub run_start_time: DateTime<Utc>,
    pub run_end_time: DateTime<Utc>,
    pub settings: FunnelSettings,
    pub provenance: RunProvenance,
    pub candidates: Vec<FinalistRecord>,
}

impl ScreeningRun {
    pub fn time_taken_secs(&self) -> f64 {
        (self.run_end_time - self.run_start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// Everything written by a single persistence call.
#[derive(Debug, Clone)]
pub struct RunBundle {
    pub job: JobPosting,
    pub documents: Vec<CandidateDocument>,
    pub run: ScreeningRun,
}
