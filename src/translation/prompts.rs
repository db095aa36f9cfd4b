/*!
 * Prompt construction and response parsing.
 *
 * A batch request sends one segment per line in the user message; the system
 * prompt asks for exactly one translated line per input line. Responses are
 * split back into lines and checked against the number of lines sent.
 */

use crate::errors::TranslationError;

/// Fill the `{source_language}` and `{target_language}` placeholders
pub fn system_prompt(template: &str, source_language: &str, target_language: &str) -> String {
    template
        .replace("{source_language}", source_language)
        .replace("{target_language}", target_language)
}

/// User message for a batch: one segment per line
pub fn batch_prompt<S: AsRef<str>>(segments: &[S]) -> String {
    segments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n")
}

/// Normalize line endings and drop a surrounding markdown code fence
fn normalize_response(response: &str) -> String {
    let text = response.replace("\r\n", "\n");
    let trimmed = text.trim();

    let mut lines: Vec<&str> = trimmed.split('\n').collect();
    if lines.len() >= 2
        && lines.first().is_some_and(|l| l.trim_start().starts_with("```"))
        && lines.last().is_some_and(|l| l.trim() == "```")
    {
        lines.remove(0);
        lines.pop();
    }

    lines.join("\n")
}

/// Split a batch response into one translation per line
pub fn parse_batch_response(response: &str, expected: usize) -> Result<Vec<String>, TranslationError> {
    let normalized = normalize_response(response);
    let lines: Vec<String> = if normalized.trim().is_empty() {
        Vec::new()
    } else {
        normalized.split('\n').map(|line| line.trim().to_string()).collect()
    };

    if lines.len() != expected || lines.iter().any(String::is_empty) {
        return Err(TranslationError::CountMismatch {
            expected,
            got: lines.iter().filter(|l| !l.is_empty()).count(),
        });
    }

    Ok(lines)
}

/// Clean a response to a single-segment request; line breaks inside are kept
pub fn parse_single_response(response: &str) -> Result<String, TranslationError> {
    let normalized = normalize_response(response);
    let text = normalized.trim();

    if text.is_empty() {
        return Err(TranslationError::CountMismatch { expected: 1, got: 0 });
    }

    Ok(text.to_string())
}
