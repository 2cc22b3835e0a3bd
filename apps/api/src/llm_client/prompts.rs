// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps assessments tied to the document text.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the candidate document provided. \
    Do NOT infer skills, employers, dates or degrees that the document does not state. \
    If the document does not support a claim, omit it entirely.";

/// Appends the JSON-only rules to a task-specific system prompt.
pub fn json_only_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}

/// Substitutes `{key}` placeholders in one pass over `template`. Inserted values
/// are never rescanned, so a value containing `{other_key}` is copied verbatim.
/// Braces that do not form a known placeholder pass through unchanged.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, value)| value.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let placeholder = values.iter().find_map(|(key, value)| {
            tail.strip_prefix(*key)
                .and_then(|after| after.strip_prefix('}'))
                .map(|after| (*value, after))
        });
        match placeholder {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cuts `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
