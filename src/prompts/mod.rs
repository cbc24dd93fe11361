//! Prompts sent to the upstream completion API
//!
//! The system prompt is a fixed template describing the Formily schema
//! dialect, the component vocabulary and the layout rules. The user text
//! wraps the caller's description of the form.

pub mod formily_prompt;

/// Builds the fixed system prompt for schema generation
///
/// # Examples
///
/// ```
/// use formcraft::prompts::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("Formily 2.x"));
/// assert!(prompt.contains("FormLayout"));
/// ```
pub fn build_system_prompt() -> String {
    formily_prompt::generate_formily_prompt()
}

/// Builds the text part of the user message
///
/// An empty or whitespace-only description yields an instruction to work
/// from the image alone.
///
/// # Examples
///
/// ```
/// use formcraft::prompts::build_user_text;
///
/// let text = build_user_text("name, age");
/// assert!(text.contains("name, age"));
/// ```
pub fn build_user_text(description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        "Generate a Formily 2.x schema for the form shown in the image.".to_string()
    } else {
        format!(
            "Image description: {}\n\nGenerate a Formily 2.x schema based on the description above.",
            description
        )
    }
}
