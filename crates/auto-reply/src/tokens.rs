//! Control tokens an agent can emit instead of (or alongside) a visible reply.

/// Liveness marker returned by the agent when a heartbeat check finds nothing.
pub const HEARTBEAT_OK: &str = "HEARTBEAT_OK";

/// Default token meaning "produce no visible reply".
pub const NO_REPLY: &str = "NO_REPLY";

/// Returns `true` if `text` is a silent reply for `token`.
///
/// The token counts when it opens the reply (after leading whitespace) and is
/// followed by the end of text or a non-word character, or when it closes the
/// reply at a word boundary with only non-word characters after it. The token
/// inside a word (`"xNO_REPLY"`, `"NO_REPLYING"`) does not count.
pub fn is_silent_reply_text(text: &str, token: &str) -> bool {
    if text.is_empty() || token.is_empty() {
        return false;
    }

    if let Some(after) = text.trim_start().strip_prefix(token)
        && after.chars().next().is_none_or(|c| !is_word_char(c))
    {
        return true;
    }

    let body = text.trim_end_matches(|c: char| !is_word_char(c));
    body.strip_suffix(token).is_some_and(|before| {
        before.chars().next_back().is_none_or(|c| !is_word_char(c))
            && token.chars().next_back().is_some_and(is_word_char)
    })
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
