// LLM prompt constants for the screening module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Candidate text is cut to this many characters before it is sent.
pub const MAX_DOCUMENT_CHARS: usize = 12_000;
/// Job text is cut to this many characters before it is sent.
pub const MAX_JOB_CHARS: usize = 6_000;
/// Name extraction only needs the head of the document.
pub const NAME_WINDOW_CHARS: usize = 2_000;

/// Role for name extraction; the JSON-only rules are appended when sending.
pub const NAME_ROLE: &str = "You read resumes and return the candidate's full name.";

/// Name extraction prompt. Replace `{document}` before sending.
pub const NAME_PROMPT_TEMPLATE: &str = r#"Return the full name of the person this resume belongs to.

Return a JSON object with this EXACT schema (no extra fields):
{"name": "Jane Doe"}

If the document does not state a name, return {"name": ""}.

RESUME:
{document}"#;

/// Role for the fit assessment.
pub const ASSESSMENT_ROLE: &str = "You are an experienced technical recruiter scoring \
    how well one candidate fits one job.";

/// Fit assessment prompt.
/// Replace: {evidence_instruction}, {job}, {document}
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"{evidence_instruction}

Assess the candidate below against the job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "Two or three sentences on who the candidate is.",
  "fitScore": 72,
  "technicalSkills": {
    "exactMatches": ["Rust", "PostgreSQL"],
    "transferable": ["Go -> Rust"]
  },
  "nonTechnicalSkills": ["Mentoring"],
  "experienceHighlights": "Most relevant roles and achievements.",
  "educationHighlights": "Degrees and certifications relevant to the job.",
  "justification": "Why the score is what it is.",
  "gaps": ["No Kubernetes experience"]
}

SCORING:
- fitScore is a number from 0 to 100.
- 90+: meets every hard requirement with directly relevant experience.
- 70-89: meets most requirements; gaps are learnable.
- 40-69: partial fit; several requirements missing.
- below 40: weak fit.

exactMatches: skills the job asks for that the resume names explicitly.
transferable: adjacent skills that would carry over.
gaps: requirements the resume gives no evidence for.

JOB DESCRIPTION:
{job}

RESUME:
{document}"#;
