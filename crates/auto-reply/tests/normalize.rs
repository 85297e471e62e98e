#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::sync::{Arc, Mutex};

use {
    courier_auto_reply::{
        DirectiveParser, HeartbeatStripper, NormalizeReplyOptions, Normalized, PrefixResolver,
        ReplyNormalizer, ResponsePrefixContext, SkipReason, TextSanitizer,
        heartbeat::{StripMode, StripResult},
        sanitize::SanitizeOptions,
    },
    courier_common::types::ReplyPayload,
    courier_config::OutboundRegexRule,
    serde_json::json,
};

// ── Test doubles ────────────────────────────────────────────────────────────

/// Records every call and returns the text unchanged.
#[derive(Default)]
struct RecordingSanitizer(Mutex<Vec<(String, bool)>>);

impl TextSanitizer for RecordingSanitizer {
    fn sanitize(&self, text: &str, options: SanitizeOptions) -> String {
        self.0
            .lock()
            .unwrap()
            .push((text.to_string(), options.error_context));
        text.to_string()
    }
}

/// Returns a canned result regardless of input.
struct FixedStripper(StripResult);

impl HeartbeatStripper for FixedStripper {
    fn strip(&self, _text: &str, mode: StripMode) -> StripResult {
        assert_eq!(mode, StripMode::Message);
        self.0.clone()
    }
}

/// Treats `@@` as a directive marker: removes it and sets `channel_data.test`.
#[derive(Default)]
struct MarkerParser(Mutex<Vec<String>>);

impl DirectiveParser for MarkerParser {
    fn has_directives(&self, text: &str) -> bool {
        text.contains("@@")
    }

    fn parse(&self, mut payload: ReplyPayload) -> ReplyPayload {
        let text = payload.text.take().unwrap_or_default();
        self.0.lock().unwrap().push(text.clone());
        payload.text = Some(text.replace("@@", "").trim().to_string());
        payload
            .channel_data
            .insert("test".into(), json!({ "marker": true }));
        payload
    }
}

struct FixedPrefix(&'static str);

impl PrefixResolver for FixedPrefix {
    fn resolve(&self, _template: Option<&str>, _context: &ResponsePrefixContext) -> Option<String> {
        Some(self.0.to_string())
    }
}

fn text(payload: &str) -> ReplyPayload {
    ReplyPayload::text(payload)
}

fn with_media(payload: &str) -> ReplyPayload {
    ReplyPayload {
        media_urls: vec!["https://example.com/a.png".into()],
        ..ReplyPayload::text(payload)
    }
}

fn sent(outcome: Normalized) -> ReplyPayload {
    match outcome {
        Normalized::Send(payload) => payload,
        Normalized::Suppressed(reason) => panic!("reply suppressed: {reason}"),
    }
}

fn rule(pattern: &str, replacement: &str) -> OutboundRegexRule {
    OutboundRegexRule::new(pattern, replacement)
}

// ── Skip decisions ──────────────────────────────────────────────────────────

#[test]
fn whitespace_only_reports_empty_once() {
    let reasons = Mutex::new(Vec::new());
    let on_skip = |reason: SkipReason| reasons.lock().unwrap().push(reason);
    let options = NormalizeReplyOptions::default().on_skip(&on_skip);

    let out = ReplyNormalizer::new().normalize(text("   "), &options);

    assert_eq!(out, Normalized::Suppressed(SkipReason::Empty));
    assert_eq!(*reasons.lock().unwrap(), vec![SkipReason::Empty]);
}

#[test]
fn silent_token_never_reaches_sanitizer() {
    let sanitizer = Arc::new(RecordingSanitizer::default());
    let normalizer = ReplyNormalizer::new().with_sanitizer(sanitizer.clone());

    let out = normalizer.normalize(text("NO_REPLY"), &NormalizeReplyOptions::default());

    assert_eq!(out, Normalized::Suppressed(SkipReason::Silent));
    assert!(sanitizer.0.lock().unwrap().is_empty());
}

#[test]
fn silent_with_media_sends_empty_text() {
    let out = sent(ReplyNormalizer::new().normalize(with_media("NO_REPLY"), &Default::default()));
    assert_eq!(out.text.as_deref(), Some(""));
    assert_eq!(out.media_urls.len(), 1);
}

#[test]
fn heartbeat_with_media_keeps_stripper_text() {
    let stripper = FixedStripper(StripResult {
        should_skip: true,
        text: "leftover".into(),
        did_strip: true,
    });
    let normalizer = ReplyNormalizer::new().with_heartbeat_stripper(Arc::new(stripper));

    let out = sent(normalizer.normalize(with_media("HEARTBEAT_OK"), &Default::default()));

    assert_eq!(out.text.as_deref(), Some("leftover"));
}

#[test]
fn heartbeat_skip_without_media() {
    let strips = Mutex::new(0);
    let reasons = Mutex::new(Vec::new());
    let on_strip = || *strips.lock().unwrap() += 1;
    let on_skip = |reason: SkipReason| reasons.lock().unwrap().push(reason);
    let options = NormalizeReplyOptions::default()
        .on_heartbeat_strip(&on_strip)
        .on_skip(&on_skip);

    let out = ReplyNormalizer::new().normalize(text("HEARTBEAT_OK"), &options);

    assert_eq!(out, Normalized::Suppressed(SkipReason::Heartbeat));
    assert_eq!(*strips.lock().unwrap(), 1);
    assert_eq!(*reasons.lock().unwrap(), vec![SkipReason::Heartbeat]);
}

#[test]
fn stripper_not_consulted_without_token() {
    let stripper = FixedStripper(StripResult {
        should_skip: true,
        text: String::new(),
        did_strip: true,
    });
    let normalizer = ReplyNormalizer::new().with_heartbeat_stripper(Arc::new(stripper));

    let out = sent(normalizer.normalize(text("all good"), &Default::default()));

    assert_eq!(out.text.as_deref(), Some("all good"));
}

#[test]
fn channel_data_only_payload_is_sent() {
    let mut payload = ReplyPayload::default();
    payload.channel_data.insert("x".into(), json!(1));

    let out = sent(ReplyNormalizer::new().normalize(payload, &Default::default()));

    assert_eq!(out.text, None);
    assert_eq!(out.channel_data["x"], json!(1));
}

#[test]
fn passthrough_fields_survive_every_step() {
    let payload = ReplyPayload::from_json(
        r#"{"text":"hi [[quick_replies: A]]","replyToTag":true,"btw":{"q":1}}"#,
    )
    .unwrap();
    let options = NormalizeReplyOptions::default().with_response_prefix("[Bot]");

    let out = sent(ReplyNormalizer::new().normalize(payload, &options));

    assert_eq!(out.text.as_deref(), Some("[Bot] hi"));
    assert_eq!(out.extra["replyToTag"], json!(true));
    assert_eq!(out.extra["btw"], json!({ "q": 1 }));
}

// ── Text pipeline ───────────────────────────────────────────────────────────

#[test]
fn error_flag_forwarded_to_sanitizer() {
    let sanitizer = Arc::new(RecordingSanitizer::default());
    let normalizer = ReplyNormalizer::new().with_sanitizer(sanitizer.clone());
    let payload = ReplyPayload {
        is_error: true,
        ..text("boom")
    };

    sent(normalizer.normalize(payload, &Default::default()));

    assert_eq!(*sanitizer.0.lock().unwrap(), vec![("boom".to_string(), true)]);
}

#[test]
fn rules_run_in_order() {
    let rules = [
        rule("foo", "hello"),
        rule("bar", "beautiful"),
        rule("baz", "world"),
    ];
    let options = NormalizeReplyOptions::default().with_outbound_regex(&rules);

    let out = sent(ReplyNormalizer::new().normalize(text("foo bar baz"), &options));

    assert_eq!(out.text.as_deref(), Some("hello beautiful world"));
}

#[test]
fn invalid_rule_does_not_block_others() {
    let rules = [rule("[invalid", "x"), rule("world", "courier")];
    let options = NormalizeReplyOptions::default().with_outbound_regex(&rules);

    let out = sent(ReplyNormalizer::new().normalize(text("hello world"), &options));

    assert_eq!(out.text.as_deref(), Some("hello courier"));
}

#[test]
fn rule_erasing_text_is_empty_skip() {
    let rules = [rule(r"<delete>[\s\S]*?</delete>", "").with_flags("gi")];
    let options = NormalizeReplyOptions::default().with_outbound_regex(&rules);

    let out = ReplyNormalizer::new().normalize(text("<DELETE>all</DELETE>"), &options);

    assert_eq!(out, Normalized::Suppressed(SkipReason::Empty));
}

#[test]
fn rule_erasing_text_with_media_sends_empty_text() {
    let rules = [rule(".+", "")];
    let options = NormalizeReplyOptions::default().with_outbound_regex(&rules);

    let out = sent(ReplyNormalizer::new().normalize(with_media("caption"), &options));

    assert_eq!(out.text.as_deref(), Some(""));
}

#[test]
fn directives_see_rewritten_text() {
    let parser = Arc::new(MarkerParser::default());
    let normalizer = ReplyNormalizer::new().with_directive_parser(parser.clone());
    let rules = [rule("MARK", "@@")];
    let options = NormalizeReplyOptions::default().with_outbound_regex(&rules);

    let out = sent(normalizer.normalize(text("hi MARK"), &options));

    assert_eq!(*parser.0.lock().unwrap(), vec!["hi @@".to_string()]);
    assert_eq!(out.text.as_deref(), Some("hi"));
    assert_eq!(out.channel_data["test"], json!({ "marker": true }));
}

#[test]
fn directive_parser_skipped_for_plain_text() {
    let parser = Arc::new(MarkerParser::default());
    let normalizer = ReplyNormalizer::new().with_directive_parser(parser.clone());

    sent(normalizer.normalize(text("nothing special"), &Default::default()));

    assert!(parser.0.lock().unwrap().is_empty());
}

// ── Prefix ──────────────────────────────────────────────────────────────────

#[test]
fn prefix_is_idempotent() {
    let normalizer = ReplyNormalizer::new();
    let options = NormalizeReplyOptions::default().with_response_prefix("[Bot]");

    let first = sent(normalizer.normalize(text("hi"), &options));
    assert_eq!(first.text.as_deref(), Some("[Bot] hi"));

    let second = sent(normalizer.normalize(first, &options));
    assert_eq!(second.text.as_deref(), Some("[Bot] hi"));
}

#[test]
fn prefix_not_rewritten_by_rules() {
    let rules = [rule("Bot", "Robot")];
    let options = NormalizeReplyOptions::default()
        .with_response_prefix("[Bot]")
        .with_outbound_regex(&rules);

    let out = sent(ReplyNormalizer::new().normalize(text("Bot says hi"), &options));

    assert_eq!(out.text.as_deref(), Some("[Bot] Robot says hi"));
}

#[test]
fn prefix_skips_bare_heartbeat_and_empty_text() {
    let options = NormalizeReplyOptions {
        response_prefix: Some("[Bot]"),
        strip_heartbeat: Some(false),
        ..Default::default()
    };
    let normalizer = ReplyNormalizer::new();

    let heartbeat = sent(normalizer.normalize(text(" HEARTBEAT_OK "), &options));
    assert_eq!(heartbeat.text.as_deref(), Some(" HEARTBEAT_OK "));

    let media = sent(normalizer.normalize(with_media(""), &options));
    assert_eq!(media.text.as_deref(), Some(""));
}

#[test]
fn resolver_used_only_with_context() {
    let normalizer = ReplyNormalizer::new().with_prefix_resolver(Arc::new(FixedPrefix("[resolved]")));
    let context = ResponsePrefixContext::default();
    let plain = NormalizeReplyOptions::default().with_response_prefix("[raw]");
    let templated = plain.with_prefix_context(&context);

    let out = sent(normalizer.normalize(text("hi"), &plain));
    assert_eq!(out.text.as_deref(), Some("[raw] hi"));

    let out = sent(normalizer.normalize(text("hi"), &templated));
    assert_eq!(out.text.as_deref(), Some("[resolved] hi"));
}

#[test]
fn normalizer_is_shareable_across_threads() {
    let normalizer = Arc::new(ReplyNormalizer::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let normalizer = Arc::clone(&normalizer);
            std::thread::spawn(move || {
                let out = normalizer.normalize(text(&format!("reply {i}")), &Default::default());
                sent(out).text
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(format!("reply {i}")));
    }
}
