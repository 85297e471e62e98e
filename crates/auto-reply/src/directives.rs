//! LINE rich-content directives embedded in reply text.
//!
//! An agent can write `[[quick_replies: Yes, No]]`,
//! `[[location: Office | 1-2-3 Shibuya | 35.66 | 139.70]]`,
//! `[[confirm: Delete it? | Yes | No]]` or
//! `[[buttons: Menu | Pick one | Docs:https://example.com, Help:help]]`
//! anywhere in its reply. Recognised blocks are removed from the text and
//! land in `channel_data.line`; malformed blocks are left as written.

use {
    courier_common::types::ReplyPayload,
    serde_json::{Map, Value, json},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use courier_metrics::{auto_reply as auto_reply_metrics, counter, labels};

use crate::normalize::DirectiveParser;

/// Channel-data key the directives are stored under.
pub const LINE_CHANNEL: &str = "line";

const MAX_QUICK_REPLIES: usize = 13;
const MAX_QUICK_REPLY_LABEL_CHARS: usize = 20;
const MAX_BUTTON_ACTIONS: usize = 4;

const DIRECTIVE_NAMES: &[&str] = &["quick_replies", "location", "confirm", "buttons"];

/// Built-in [`DirectiveParser`] for LINE directives.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDirectiveParser;

impl DirectiveParser for LineDirectiveParser {
    fn has_directives(&self, text: &str) -> bool {
        has_line_directives(text)
    }

    fn parse(&self, payload: ReplyPayload) -> ReplyPayload {
        parse_line_directives(payload)
    }
}

/// A `[[name: body]]` block located in the text.
struct Block<'a> {
    start: usize,
    end: usize,
    name: String,
    body: &'a str,
}

fn blocks(text: &str) -> impl Iterator<Item = Block<'_>> {
    let mut offset = 0;
    std::iter::from_fn(move || {
        loop {
            let start = offset + text[offset..].find("[[")?;
            let inner_start = start + 2;
            let close = text[inner_start..].find("]]")?;
            let inner = &text[inner_start..inner_start + close];
            let end = inner_start + close + 2;
            let Some((name, body)) = inner.split_once(':') else {
                offset = inner_start;
                continue;
            };
            let name = name.trim().to_ascii_lowercase();
            if !DIRECTIVE_NAMES.contains(&name.as_str()) {
                offset = inner_start;
                continue;
            }
            offset = end;
            return Some(Block {
                start,
                end,
                name,
                body: body.trim(),
            });
        }
    })
}

pub fn has_line_directives(text: &str) -> bool {
    blocks(text).next().is_some()
}

/// Extract directives from `payload.text` into `channel_data.line`.
pub fn parse_line_directives(mut payload: ReplyPayload) -> ReplyPayload {
    let Some(text) = payload.text.take() else {
        return payload;
    };

    let mut line = Map::new();
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0;

    for block in blocks(&text) {
        let Some((key, value)) = parse_block(&block.name, block.body) else {
            debug!(directive = %block.name, "malformed LINE directive left in text");
            continue;
        };
        #[cfg(feature = "metrics")]
        counter!(
            auto_reply_metrics::DIRECTIVES_PARSED_TOTAL,
            labels::DIRECTIVE => block.name.clone()
        )
        .increment(1);
        kept.push_str(&text[cursor..block.start]);
        cursor = block.end;
        line.insert(key.to_string(), value);
    }
    kept.push_str(&text[cursor..]);

    if line.is_empty() {
        payload.text = Some(text);
        return payload;
    }

    debug!(fields = line.len(), "extracted LINE directives");
    match payload.channel_data.get_mut(LINE_CHANNEL) {
        Some(Value::Object(existing)) => existing.extend(line),
        _ => {
            payload
                .channel_data
                .insert(LINE_CHANNEL.to_string(), Value::Object(line));
        },
    }
    payload.text = Some(tidy(&kept));
    payload
}

fn parse_block(name: &str, body: &str) -> Option<(&'static str, Value)> {
    match name {
        "quick_replies" => parse_quick_replies(body).map(|v| ("quickReplies", v)),
        "location" => parse_location(body).map(|v| ("location", v)),
        "confirm" => parse_confirm(body).map(|v| ("templateMessage", v)),
        "buttons" => parse_buttons(body).map(|v| ("templateMessage", v)),
        _ => None,
    }
}

fn pipe_fields(body: &str) -> Vec<&str> {
    body.split('|').map(str::trim).collect()
}

fn parse_quick_replies(body: &str) -> Option<Value> {
    let labels: Vec<String> = body
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .take(MAX_QUICK_REPLIES)
        .map(|label| label.chars().take(MAX_QUICK_REPLY_LABEL_CHARS).collect())
        .collect();
    (!labels.is_empty()).then(|| json!(labels))
}

fn parse_location(body: &str) -> Option<Value> {
    let [title, address, lat, lng] = pipe_fields(body)[..] else {
        return None;
    };
    let latitude: f64 = lat.parse().ok().filter(|v: &f64| (-90.0..=90.0).contains(v))?;
    let longitude: f64 = lng
        .parse()
        .ok()
        .filter(|v: &f64| (-180.0..=180.0).contains(v))?;
    if title.is_empty() {
        return None;
    }
    Some(json!({
        "title": title,
        "address": address,
        "latitude": latitude,
        "longitude": longitude,
    }))
}

/// `"Yes"` → (`"Yes"`, `"yes"`); `"Yes:confirm_delete"` → (`"Yes"`, `"confirm_delete"`).
fn label_and_data(raw: &str) -> Option<(&str, String)> {
    let (label, data) = match raw.split_once(':') {
        Some((label, data)) => (label.trim(), data.trim().to_string()),
        None => (raw.trim(), raw.trim().to_lowercase()),
    };
    (!label.is_empty() && !data.is_empty()).then_some((label, data))
}

fn parse_confirm(body: &str) -> Option<Value> {
    let [question, yes, no] = pipe_fields(body)[..] else {
        return None;
    };
    if question.is_empty() {
        return None;
    }
    let (confirm_label, confirm_data) = label_and_data(yes)?;
    let (cancel_label, cancel_data) = label_and_data(no)?;
    Some(json!({
        "type": "confirm",
        "text": question,
        "confirmLabel": confirm_label,
        "confirmData": confirm_data,
        "cancelLabel": cancel_label,
        "cancelData": cancel_data,
        "altText": question,
    }))
}

fn parse_buttons(body: &str) -> Option<Value> {
    let [title, text, actions] = pipe_fields(body)[..] else {
        return None;
    };
    let actions: Vec<Value> = actions
        .split(',')
        .filter_map(label_and_data)
        .take(MAX_BUTTON_ACTIONS)
        .map(|(label, data)| {
            if data.starts_with("https://") || data.starts_with("http://") {
                json!({ "type": "uri", "label": label, "uri": data })
            } else {
                json!({ "type": "message", "label": label, "text": data })
            }
        })
        .collect();
    if actions.is_empty() || (title.is_empty() && text.is_empty()) {
        return None;
    }
    let alt_text = if title.is_empty() {
        text
    } else {
        title
    };
    Some(json!({
        "type": "buttons",
        "title": title,
        "text": text,
        "actions": actions,
        "altText": alt_text,
    }))
}

/// Trim trailing spaces on each line, collapse blank runs, trim the whole.
fn tidy(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}
