//! Best-effort extraction of a program body from free-form generated text.

/// Pull the body of the first fenced code block out of `text`.
///
/// The opening fence may carry a language tag; it is ignored. If no complete
/// fenced block is present the input is returned unchanged, so the caller can
/// still show or edit whatever the model sent back.
pub fn extract_code(text: &str) -> String {
    const FENCE: &str = "```";

    let Some(open) = text.find(FENCE) else {
        return text.to_string();
    };
    let after_fence = &text[open + FENCE.len()..];
    // Body starts after the opening fence's line.
    let Some(nl) = after_fence.find('\n') else {
        return text.to_string();
    };
    let body = &after_fence[nl + 1..];
    match body.find(FENCE) {
        Some(close) => body[..close].trim().to_string(),
        None => text.to_string(),
    }
}
