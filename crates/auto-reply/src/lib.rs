//! Outbound reply normalization: the last stop before a reply reaches a channel.
//!
//! Flow: empty check → silent token → heartbeat strip → sanitize →
//! outbound regex rules → empty re-check → channel directives → response prefix.
//!
//! Each text step after the token checks sits behind a trait in [`normalize`]
//! so embedders and tests can swap it out.

pub mod directives;
pub mod heartbeat;
pub mod normalize;
pub mod outbound_regex;
pub mod prefix_template;
pub mod sanitize;
pub mod tokens;

pub use {
    normalize::{
        DirectiveParser, HeartbeatStripper, NormalizeReplyOptions, Normalized, PrefixResolver,
        ReplyNormalizer, SkipReason, TextSanitizer, normalize_reply_payload,
    },
    outbound_regex::apply_outbound_regex,
    prefix_template::ResponsePrefixContext,
    tokens::{HEARTBEAT_OK, NO_REPLY},
};
