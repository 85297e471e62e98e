//! Heartbeat token stripping for outbound replies.

use crate::{normalize::HeartbeatStripper, tokens::HEARTBEAT_OK};

/// Default maximum characters for an acknowledgment that still counts as
/// "nothing to report" in heartbeat mode.
pub const DEFAULT_ACK_MAX_CHARS: usize = 300;

/// Result of stripping [`HEARTBEAT_OK`] from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripResult {
    /// Whether the reply should be suppressed (not delivered to the user).
    pub should_skip: bool,
    /// The remaining text after stripping.
    pub text: String,
    /// Whether the token was found and removed.
    pub did_strip: bool,
}

/// How the stripped remainder is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripMode {
    /// Regular outbound reply: only an empty remainder is skipped.
    Message,
    /// Reply to a heartbeat poll: short acknowledgments are skipped too.
    Heartbeat { max_ack_chars: usize },
}

/// Formatting wrappers an agent commonly puts around the token.
const WRAPPERS: &[(&str, &str)] = &[
    ("**", "**"),
    ("__", "__"),
    ("*", "*"),
    ("_", "_"),
    ("`", "`"),
    ("~~", "~~"),
    ("<b>", "</b>"),
    ("<strong>", "</strong>"),
    ("<code>", "</code>"),
];

/// Built-in [`HeartbeatStripper`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatTokenStripper;

impl HeartbeatStripper for HeartbeatTokenStripper {
    fn strip(&self, text: &str, mode: StripMode) -> StripResult {
        strip_heartbeat_token(text, mode)
    }
}

/// Strip [`HEARTBEAT_OK`] from the edges of `text`.
///
/// A token buried in the middle of prose is left alone.
pub fn strip_heartbeat_token(text: &str, mode: StripMode) -> StripResult {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return StripResult {
            should_skip: true,
            text: String::new(),
            did_strip: false,
        };
    }

    if !trimmed.contains(HEARTBEAT_OK) {
        return StripResult {
            should_skip: false,
            text: trimmed.to_string(),
            did_strip: false,
        };
    }

    let (rest, did_strip) = strip_edges(trimmed);
    if !did_strip {
        return StripResult {
            should_skip: false,
            text: trimmed.to_string(),
            did_strip: false,
        };
    }

    let should_skip = match mode {
        StripMode::Message => rest.is_empty(),
        StripMode::Heartbeat { max_ack_chars } => rest.chars().count() <= max_ack_chars,
    };

    StripResult {
        should_skip,
        text: if should_skip {
            String::new()
        } else {
            rest.to_string()
        },
        did_strip,
    }
}

/// Repeatedly remove the token (bare or wrapped) from both ends.
fn strip_edges(text: &str) -> (&str, bool) {
    let mut rest = text;
    let mut did_strip = false;
    loop {
        let before = rest.len();
        rest = strip_leading(rest);
        rest = strip_trailing(rest);
        if rest.len() == before {
            break;
        }
        did_strip = true;
    }
    (rest, did_strip)
}

fn strip_leading(text: &str) -> &str {
    for &(open, close) in WRAPPERS {
        if let Some(rest) = text
            .strip_prefix(open)
            .and_then(|s| s.strip_prefix(HEARTBEAT_OK))
            .and_then(|s| s.strip_prefix(close))
        {
            return rest.trim_start();
        }
    }
    text.strip_prefix(HEARTBEAT_OK)
        .filter(|rest| !rest.starts_with(is_word_char))
        .map_or(text, str::trim_start)
}

fn strip_trailing(text: &str) -> &str {
    // Trailing punctuation after the token ("... HEARTBEAT_OK.") goes with it.
    let body = text.trim_end_matches(['.', '!', '?']);
    for &(open, close) in WRAPPERS {
        if let Some(rest) = body
            .strip_suffix(close)
            .and_then(|s| s.strip_suffix(HEARTBEAT_OK))
            .and_then(|s| s.strip_suffix(open))
        {
            return rest.trim_end();
        }
    }
    body.strip_suffix(HEARTBEAT_OK)
        .filter(|rest| !rest.ends_with(is_word_char))
        .map_or(text, str::trim_end)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
