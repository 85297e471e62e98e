//! Outbound reply normalization.
//!
//! [`ReplyNormalizer::normalize`] decides whether a candidate reply is sent
//! and, if so, runs its text through the ordered rewrite steps. Media and
//! channel data keep a reply alive even when its text is empty, silent or a
//! bare heartbeat acknowledgment.

use std::{
    fmt,
    sync::{Arc, LazyLock},
};

use {
    courier_common::types::ReplyPayload,
    courier_config::{MessagesConfig, OutboundRegexRule},
    serde::Serialize,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use courier_metrics::{auto_reply as auto_reply_metrics, counter, labels};

use crate::{
    directives::LineDirectiveParser,
    heartbeat::{HeartbeatTokenStripper, StripMode, StripResult},
    outbound_regex::apply_outbound_regex,
    prefix_template::{ResponsePrefixContext, TemplatePrefixResolver},
    sanitize::{SanitizeOptions, UserFacingSanitizer},
    tokens::{HEARTBEAT_OK, NO_REPLY, is_silent_reply_text},
};

// ── Collaborators ───────────────────────────────────────────────────────────

/// Cleans text before it reaches a user.
pub trait TextSanitizer: Send + Sync {
    fn sanitize(&self, text: &str, options: SanitizeOptions) -> String;
}

/// Removes the heartbeat token from reply text.
pub trait HeartbeatStripper: Send + Sync {
    fn strip(&self, text: &str, mode: StripMode) -> StripResult;
}

/// Extracts channel directives embedded in reply text.
pub trait DirectiveParser: Send + Sync {
    fn has_directives(&self, text: &str) -> bool;

    /// Receives the payload with its current text; may rewrite the text and
    /// add to `channel_data`.
    fn parse(&self, payload: ReplyPayload) -> ReplyPayload;
}

/// Resolves a response prefix template against runtime context.
pub trait PrefixResolver: Send + Sync {
    fn resolve(&self, template: Option<&str>, context: &ResponsePrefixContext) -> Option<String>;
}

// ── Outcome ─────────────────────────────────────────────────────────────────

/// Why a reply was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    Empty,
    Silent,
    Heartbeat,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Silent => "silent",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Send(ReplyPayload),
    Suppressed(SkipReason),
}

impl Normalized {
    pub fn into_payload(self) -> Option<ReplyPayload> {
        match self {
            Self::Send(payload) => Some(payload),
            Self::Suppressed(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Send(_) => None,
            Self::Suppressed(reason) => Some(*reason),
        }
    }
}

// ── Options ─────────────────────────────────────────────────────────────────

/// Per-call settings for [`ReplyNormalizer::normalize`]. Everything is optional.
#[derive(Clone, Copy, Default)]
pub struct NormalizeReplyOptions<'a> {
    /// Prefix prepended to the text, or a template when `response_prefix_context` is set.
    pub response_prefix: Option<&'a str>,
    pub response_prefix_context: Option<&'a ResponsePrefixContext>,
    pub outbound_regex: Option<&'a [OutboundRegexRule]>,
    /// Defaults to `true`.
    pub strip_heartbeat: Option<bool>,
    /// Defaults to [`NO_REPLY`]. A blank override falls back to the default.
    pub silent_token: Option<&'a str>,
    pub on_heartbeat_strip: Option<&'a dyn Fn()>,
    /// Called at most once, with the reason the reply was suppressed.
    pub on_skip: Option<&'a dyn Fn(SkipReason)>,
}

impl<'a> NormalizeReplyOptions<'a> {
    /// Options taken from the `[messages]` config section.
    pub fn from_config(config: &'a MessagesConfig) -> Self {
        Self {
            response_prefix: config.response_prefix.as_deref(),
            outbound_regex: Some(&config.outbound_regex),
            strip_heartbeat: Some(config.strip_heartbeat),
            silent_token: config.silent_token.as_deref(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_response_prefix(mut self, prefix: &'a str) -> Self {
        self.response_prefix = Some(prefix);
        self
    }

    #[must_use]
    pub fn with_prefix_context(mut self, context: &'a ResponsePrefixContext) -> Self {
        self.response_prefix_context = Some(context);
        self
    }

    #[must_use]
    pub fn with_outbound_regex(mut self, rules: &'a [OutboundRegexRule]) -> Self {
        self.outbound_regex = Some(rules);
        self
    }

    #[must_use]
    pub fn on_skip(mut self, callback: &'a dyn Fn(SkipReason)) -> Self {
        self.on_skip = Some(callback);
        self
    }

    #[must_use]
    pub fn on_heartbeat_strip(mut self, callback: &'a dyn Fn()) -> Self {
        self.on_heartbeat_strip = Some(callback);
        self
    }

    fn silent_token(&self) -> &'a str {
        self.silent_token
            .filter(|token| !token.trim().is_empty())
            .unwrap_or(NO_REPLY)
    }
}

impl fmt::Debug for NormalizeReplyOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizeReplyOptions")
            .field("response_prefix", &self.response_prefix)
            .field("response_prefix_context", &self.response_prefix_context)
            .field("outbound_regex", &self.outbound_regex.map(<[_]>::len))
            .field("strip_heartbeat", &self.strip_heartbeat)
            .field("silent_token", &self.silent_token)
            .field("on_heartbeat_strip", &self.on_heartbeat_strip.is_some())
            .field("on_skip", &self.on_skip.is_some())
            .finish()
    }
}

// ── Normalizer ──────────────────────────────────────────────────────────────

/// The normalization pipeline with its collaborators.
#[derive(Clone)]
pub struct ReplyNormalizer {
    sanitizer: Arc<dyn TextSanitizer>,
    heartbeat: Arc<dyn HeartbeatStripper>,
    directives: Arc<dyn DirectiveParser>,
    prefix: Arc<dyn PrefixResolver>,
}

impl Default for ReplyNormalizer {
    fn default() -> Self {
        Self {
            sanitizer: Arc::new(UserFacingSanitizer),
            heartbeat: Arc::new(HeartbeatTokenStripper),
            directives: Arc::new(LineDirectiveParser),
            prefix: Arc::new(TemplatePrefixResolver),
        }
    }
}

impl fmt::Debug for ReplyNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyNormalizer").finish_non_exhaustive()
    }
}

impl ReplyNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn TextSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    #[must_use]
    pub fn with_heartbeat_stripper(mut self, stripper: Arc<dyn HeartbeatStripper>) -> Self {
        self.heartbeat = stripper;
        self
    }

    #[must_use]
    pub fn with_directive_parser(mut self, parser: Arc<dyn DirectiveParser>) -> Self {
        self.directives = parser;
        self
    }

    #[must_use]
    pub fn with_prefix_resolver(mut self, resolver: Arc<dyn PrefixResolver>) -> Self {
        self.prefix = resolver;
        self
    }

    /// Normalize one reply.
    pub fn normalize(&self, mut payload: ReplyPayload, options: &NormalizeReplyOptions<'_>) -> Normalized {
        let has_media = payload.has_media();
        let has_channel_data = payload.has_channel_data();
        let keep_alive = has_media || has_channel_data;

        let skip = |reason: SkipReason| {
            debug!(%reason, has_media, has_channel_data, "suppressing outbound reply");
            #[cfg(feature = "metrics")]
            counter!(
                auto_reply_metrics::REPLIES_SKIPPED_TOTAL,
                labels::REASON => reason.as_str()
            )
            .increment(1);
            if let Some(on_skip) = options.on_skip {
                on_skip(reason);
            }
            Normalized::Suppressed(reason)
        };

        let mut text = payload.text.take();

        if text.as_deref().is_none_or(|t| t.trim().is_empty()) && !keep_alive {
            return skip(SkipReason::Empty);
        }

        if let Some(t) = text.as_deref()
            && is_silent_reply_text(t, options.silent_token())
        {
            if !keep_alive {
                return skip(SkipReason::Silent);
            }
            text = Some(String::new());
        }

        if let Some(t) = text.as_mut()
            && !t.is_empty()
            && t.trim().is_empty()
        {
            t.clear();
        }

        if options.strip_heartbeat.unwrap_or(true)
            && let Some(t) = text.as_deref()
            && t.contains(HEARTBEAT_OK)
        {
            let stripped = self.heartbeat.strip(t, StripMode::Message);
            if stripped.did_strip {
                #[cfg(feature = "metrics")]
                counter!(auto_reply_metrics::HEARTBEAT_STRIPPED_TOTAL).increment(1);
                if let Some(on_heartbeat_strip) = options.on_heartbeat_strip {
                    on_heartbeat_strip();
                }
            }
            if stripped.should_skip && !keep_alive {
                return skip(SkipReason::Heartbeat);
            }
            text = Some(stripped.text);
        }

        if let Some(t) = text.as_mut()
            && !t.is_empty()
        {
            *t = self.sanitizer.sanitize(t, SanitizeOptions {
                error_context: payload.is_error,
            });
        }

        if let Some(t) = text.as_mut()
            && !t.is_empty()
            && let Some(rules) = options.outbound_regex.filter(|rules| !rules.is_empty())
        {
            *t = apply_outbound_regex(t, Some(rules));
        }

        if text.as_deref().is_none_or(|t| t.trim().is_empty()) && !keep_alive {
            return skip(SkipReason::Empty);
        }

        if text
            .as_deref()
            .is_some_and(|t| !t.is_empty() && self.directives.has_directives(t))
        {
            payload.text = text;
            payload = self.directives.parse(payload);
            text = payload.text.take();
        }

        let prefix = match options.response_prefix_context {
            Some(context) => self.prefix.resolve(options.response_prefix, context),
            None => options.response_prefix.map(str::to_string),
        };
        if let Some(prefix) = prefix.filter(|p| !p.is_empty())
            && let Some(t) = text.as_mut()
            && !t.is_empty()
            && t.trim() != HEARTBEAT_OK
            && !t.starts_with(&prefix)
        {
            *t = format!("{prefix} {t}");
        }

        #[cfg(feature = "metrics")]
        counter!(auto_reply_metrics::REPLIES_NORMALIZED_TOTAL).increment(1);
        payload.text = text;
        Normalized::Send(payload)
    }
}

static DEFAULT_NORMALIZER: LazyLock<ReplyNormalizer> = LazyLock::new(ReplyNormalizer::default);

/// Normalize with the built-in collaborators.
pub fn normalize_reply_payload(payload: ReplyPayload, options: &NormalizeReplyOptions<'_>) -> Normalized {
    DEFAULT_NORMALIZER.normalize(payload, options)
}
