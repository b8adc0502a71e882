use regex::Regex;

/// Maximum length of the diagnostic snippet carried by [`ExtractError`].
const SNIPPET_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in model response: {snippet}")]
    NoJson { snippet: String },
}

/// Recover a single JSON object from a model's raw reply.
///
/// Well-behaved models honor the "JSON only" instruction, so a direct parse
/// is tried first. Stripping a markdown fence is the recovery path: the fence
/// interior is parsed on its own and any prose around it is ignored, never
/// merged into the result.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, ExtractError> {
    if let Some(value) = parse_object(raw.trim()) {
        return Ok(value);
    }

    // Fenced block, optional language tag: ```json ... ```
    let fence = Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").unwrap();
    if let Some(caps) = fence.captures(raw) {
        if let Some(value) = parse_object(caps[1].trim()) {
            return Ok(value);
        }
    }

    Err(ExtractError::NoJson {
        snippet: truncate_chars(raw.trim(), SNIPPET_LEN),
    })
}

/// Parse `text` as JSON, accepting only a top-level object.
fn parse_object(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .filter(serde_json::Value::is_object)
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
