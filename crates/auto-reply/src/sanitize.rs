//! User-facing text cleanup applied to every outbound reply.

use serde_json::Value;

use crate::normalize::TextSanitizer;

pub const CONTEXT_OVERFLOW_TEXT: &str = "The conversation got too long for the model. \
     Start a new session or ask me to summarize and continue.";

pub const RATE_LIMIT_TEXT: &str =
    "The model provider is rate limiting requests right now. Please try again in a moment.";

/// Phrases providers use when the prompt exceeds the context window.
const CONTEXT_OVERFLOW_MARKERS: &[&str] = &[
    "context_length_exceeded",
    "context length",
    "context window",
    "prompt is too long",
    "maximum context",
    "too many tokens",
];

/// Reasoning blocks that must never reach a channel.
const REASONING_TAGS: &[&str] = &["think", "thinking"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// The reply reports a failure; raw provider errors get rewritten.
    pub error_context: bool,
}

/// Built-in [`TextSanitizer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFacingSanitizer;

impl TextSanitizer for UserFacingSanitizer {
    fn sanitize(&self, text: &str, options: SanitizeOptions) -> String {
        sanitize_user_facing_text(text, options)
    }
}

pub fn sanitize_user_facing_text(text: &str, options: SanitizeOptions) -> String {
    let mut out = text.to_string();
    for tag in REASONING_TAGS {
        out = strip_tag_blocks(&out, tag);
    }
    out = out.replace("<final>", "").replace("</final>", "");

    if options.error_context
        && let Some(friendly) = rewrite_provider_error(&out)
    {
        return friendly;
    }

    drop_repeated_paragraphs(&collapse_blank_lines(&out))
}

/// Remove `<tag>…</tag>` blocks. An unclosed block is left in place.
fn strip_tag_blocks(text: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let Some(len) = rest[start..].find(&close) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = rest[start + len + close.len()..].trim_start_matches(['\n', '\r']);
    }
    out.push_str(rest);
    out
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;
    for c in text.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(c);
    }
    out
}

/// Drop a paragraph identical to the one right before it (streaming retries
/// sometimes emit the same block twice).
fn drop_repeated_paragraphs(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for paragraph in text.split("\n\n") {
        let repeated = kept
            .last()
            .is_some_and(|prev| !prev.trim().is_empty() && prev.trim() == paragraph.trim());
        if !repeated {
            kept.push(paragraph);
        }
    }
    kept.join("\n\n")
}

/// Turn a raw provider error (`429 {"error":{...}}`, bare JSON error bodies,
/// context overflow messages) into a sentence a user can act on.
fn rewrite_provider_error(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let (status, body) = split_status(trimmed);

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return contains_context_overflow(trimmed).then(|| CONTEXT_OVERFLOW_TEXT.to_string());
    };
    let error = json.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .or_else(|| json.get("message").and_then(Value::as_str))
        .unwrap_or("unknown error");
    let kind = error.get("type").and_then(Value::as_str);

    if contains_context_overflow(message) {
        return Some(CONTEXT_OVERFLOW_TEXT.to_string());
    }
    if status == Some(429)
        || kind == Some("rate_limit_error")
        || message.to_ascii_lowercase().contains("rate limit")
    {
        return Some(RATE_LIMIT_TEXT.to_string());
    }

    Some(match status {
        Some(code) => format!("The model provider returned an error (HTTP {code}): {message}"),
        None => format!("The model provider returned an error: {message}"),
    })
}

/// Split an optional leading 3-digit HTTP status off an error body.
fn split_status(text: &str) -> (Option<u16>, &str) {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() == 3
        && let Ok(code) = digits.parse::<u16>()
    {
        let body = text[3..].trim_start_matches([' ', ':']);
        if body.starts_with('{') {
            return (Some(code), body);
        }
    }
    (None, text)
}

fn contains_context_overflow(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    CONTEXT_OVERFLOW_MARKERS.iter().any(|m| lower.contains(m))
}
