//! Outbound regex rewriting of reply text.
//!
//! Rules run in order, each seeing the previous rule's output. A rule whose
//! pattern or flags fail to compile is skipped with a warning; it never stops
//! the remaining rules.

use {
    courier_config::{CompiledOutboundRule, OutboundRegexRule},
    regex::{Captures, Regex},
    tracing::warn,
};

#[cfg(feature = "metrics")]
use courier_metrics::{auto_reply as auto_reply_metrics, counter};

/// Apply `rules` to `text` and return the rewritten text.
pub fn apply_outbound_regex(text: &str, rules: Option<&[OutboundRegexRule]>) -> String {
    let Some(rules) = rules.filter(|r| !r.is_empty()) else {
        return text.to_string();
    };

    rules.iter().fold(text.to_string(), |acc, rule| {
        match rule.compile() {
            Ok(compiled) => replace(&acc, &compiled, &rule.replacement),
            Err(e) => {
                warn!(pattern = ?rule.pattern, error = %e, "skipping invalid outbound regex rule");
                #[cfg(feature = "metrics")]
                counter!(auto_reply_metrics::OUTBOUND_REGEX_INVALID_TOTAL).increment(1);
                acc
            },
        }
    })
}

fn replace(haystack: &str, rule: &CompiledOutboundRule, template: &str) -> String {
    let limit = if rule.global {
        0
    } else {
        1
    };
    rule.regex
        .replacen(haystack, limit, |caps: &Captures<'_>| {
            let mut out = String::new();
            expand_replacement(template, caps, haystack, &rule.regex, &mut out);
            out
        })
        .into_owned()
}

/// Expand a replacement template for one match.
///
/// Supported: `$$`, `$&`, `` $` ``, `$'`, `$1`..`$99` and `$<name>`. A
/// reference to a group the pattern doesn't have is kept literally; a group
/// that didn't participate in the match expands to nothing.
fn expand_replacement(
    template: &str,
    caps: &Captures<'_>,
    haystack: &str,
    regex: &Regex,
    out: &mut String,
) {
    let group_count = regex.captures_len() - 1;
    let has_named_groups = regex.capture_names().flatten().next().is_some();
    let Some(whole) = caps.get(0) else {
        out.push_str(template);
        return;
    };

    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let bytes = tail.as_bytes();

        match bytes.first().copied() {
            Some(b'$') => {
                out.push('$');
                rest = &tail[1..];
            },
            Some(b'&') => {
                out.push_str(whole.as_str());
                rest = &tail[1..];
            },
            Some(b'`') => {
                out.push_str(&haystack[..whole.start()]);
                rest = &tail[1..];
            },
            Some(b'\'') => {
                out.push_str(&haystack[whole.end()..]);
                rest = &tail[1..];
            },
            Some(d) if d.is_ascii_digit() => {
                let one = usize::from(d - b'0');
                let two = bytes
                    .get(1)
                    .filter(|b| b.is_ascii_digit())
                    .map(|b| one * 10 + usize::from(b - b'0'));
                match two {
                    Some(n) if (1..=group_count).contains(&n) => {
                        push_group(out, caps, n);
                        rest = &tail[2..];
                    },
                    _ if (1..=group_count).contains(&one) => {
                        push_group(out, caps, one);
                        rest = &tail[1..];
                    },
                    _ => {
                        out.push('$');
                        rest = tail;
                    },
                }
            },
            Some(b'<') if has_named_groups => match tail.find('>') {
                Some(close) => {
                    if let Some(m) = caps.name(&tail[1..close]) {
                        out.push_str(m.as_str());
                    }
                    rest = &tail[close + 1..];
                },
                None => {
                    out.push('$');
                    rest = tail;
                },
            },
            _ => {
                out.push('$');
                rest = tail;
            },
        }
    }
    out.push_str(rest);
}

fn push_group(out: &mut String, caps: &Captures<'_>, index: usize) {
    if let Some(m) = caps.get(index) {
        out.push_str(m.as_str());
    }
}
