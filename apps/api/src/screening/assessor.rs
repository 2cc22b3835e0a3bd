//! Remote-model collaborator for phase 2.
//!
//! `LanguageModelService` is the seam: production uses `ClaudeScreeningModel`
//! (all calls through `llm_client`), tests use a scripted fake.

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm_client::prompts::{
    fill_template, json_only_system, truncate_chars, EVIDENCE_INSTRUCTION,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::screening::prompts::{
    ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_ROLE, MAX_DOCUMENT_CHARS, MAX_JOB_CHARS,
    NAME_PROMPT_TEMPLATE, NAME_ROLE, NAME_WINDOW_CHARS,
};

/// Exact reply contract for the fit assessment. Unknown fields are a schema error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FitAssessment {
    pub summary: String,
    pub fit_score: f64,
    pub technical_skills: TechnicalSkills,
    pub non_technical_skills: Vec<String>,
    pub experience_highlights: String,
    pub education_highlights: String,
    pub justification: String,
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TechnicalSkills {
    pub exact_matches: Vec<String>,
    pub transferable: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractedName {
    name: String,
}

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Returns the candidate's name, or an empty string when the document has none.
    async fn extract_name(&self, document: &str) -> Result<String, LlmError>;

    async fn assess(&self, job: &str, document: &str) -> Result<FitAssessment, LlmError>;
}

pub struct ClaudeScreeningModel {
    llm: LlmClient,
}

impl ClaudeScreeningModel {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl LanguageModelService for ClaudeScreeningModel {
    async fn extract_name(&self, document: &str) -> Result<String, LlmError> {
        let prompt = build_name_prompt(document);
        let system = json_only_system(NAME_ROLE);
        let extracted: ExtractedName = self.llm.call_json(&prompt, &system).await?;
        Ok(extracted.name.trim().to_string())
    }

    async fn assess(&self, job: &str, document: &str) -> Result<FitAssessment, LlmError> {
        let prompt = build_assessment_prompt(job, document);
        self.llm
            .call_json(&prompt, &json_only_system(ASSESSMENT_ROLE))
            .await
    }
}

fn build_name_prompt(document: &str) -> String {
    fill_template(
        NAME_PROMPT_TEMPLATE,
        &[("document", truncate_chars(document, NAME_WINDOW_CHARS))],
    )
}

fn build_assessment_prompt(job: &str, document: &str) -> String {
    fill_template(
        ASSESSMENT_PROMPT_TEMPLATE,
        &[
            ("evidence_instruction", EVIDENCE_INSTRUCTION),
            ("job", truncate_chars(job, MAX_JOB_CHARS)),
            ("document", truncate_chars(document, MAX_DOCUMENT_CHARS)),
        ],
    )
}
