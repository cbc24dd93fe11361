//! JSON extraction from free-text completions
//!
//! Models often wrap the JSON answer in a Markdown fence and surround it
//! with prose. Candidates are tried in order: a ```` ```json ```` fence, any
//! ```` ``` ```` fence, then the raw text.

use crate::error::FormcraftError;
use crate::schema::SchemaDocument;
use regex::Regex;
use std::sync::OnceLock;

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid json fence regex"))
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```\s*(.*?)\s*```").expect("valid fence regex"))
}

/// Select the text that should contain the JSON document
///
/// Returns the contents of the first ```` ```json ```` fence, else of the
/// first plain fence, else the whole input. An empty fence body falls back
/// to the whole input. The result is trimmed.
///
/// # Examples
///
/// ```
/// use formcraft::gateway::extract::select_json_text;
///
/// let text = "Here you go:\n```json\n{\"a\": 1}\n```\nEnjoy!";
/// assert_eq!(select_json_text(text), "{\"a\": 1}");
/// assert_eq!(select_json_text("  {\"b\": 2} "), "{\"b\": 2}");
/// ```
pub fn select_json_text(text: &str) -> &str {
    let captured = json_fence()
        .captures(text)
        .or_else(|| any_fence().captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|body| !body.is_empty());

    captured.unwrap_or(text).trim()
}

/// Extract and parse a schema document from completion text
///
/// # Errors
///
/// Returns `FormcraftError::MalformedSchema` if the selected text is not a
/// JSON object
pub fn extract_schema(text: &str) -> Result<SchemaDocument, FormcraftError> {
    let candidate = select_json_text(text);
    SchemaDocument::parse(candidate).map_err(|e| {
        tracing::warn!("Failed to parse generated schema: {}", e);
        e
    })
}
