/// Remove a surrounding markdown code fence from model output.
///
/// Handles an opening fence with or without an info string (```` ```go ````,
/// ```` ```go title="main.go" ````) and a closing fence; the result is trimmed. Text without
/// a leading fence is returned trimmed and otherwise untouched.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // The rest of the opening line is the info string
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };

    let body = body.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}
