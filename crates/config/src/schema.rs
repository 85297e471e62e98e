/// Config schema types (messages, identity).
use std::str::FromStr;

use {
    regex::{Regex, RegexBuilder},
    serde::{Deserialize, Serialize},
};

use crate::error::{Error, Result};

/// Variables understood by the response prefix template, lowercase.
pub const RESPONSE_PREFIX_VARIABLES: &[&str] = &[
    "model",
    "modelfull",
    "provider",
    "thinkinglevel",
    "think",
    "identity.name",
    "identityname",
];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub messages: MessagesConfig,
    pub identity: AgentIdentity,
}

/// Agent identity, available to the response prefix template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentIdentity {
    pub name: Option<String>,
}

/// Outbound message settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Prefix prepended to every outbound text reply, e.g. `"[{identity.name}]"`.
    pub response_prefix: Option<String>,
    /// Overrides the default `NO_REPLY` silent token.
    pub silent_token: Option<String>,
    /// Strip `HEARTBEAT_OK` from replies. Defaults to true.
    pub strip_heartbeat: bool,
    /// Regex rewrites applied to reply text, in order.
    pub outbound_regex: Vec<OutboundRegexRule>,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            response_prefix: None,
            silent_token: None,
            strip_heartbeat: true,
            outbound_regex: Vec::new(),
        }
    }
}

/// A single outbound rewrite rule.
///
/// `flags` follows the usual regex literal flag letters; absent means `"g"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRegexRule {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
}

impl OutboundRegexRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            flags: None,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    /// Compile the rule's pattern with its flags.
    pub fn compile(&self) -> Result<CompiledOutboundRule> {
        let flags: RegexFlags = self.flags.as_deref().unwrap_or("g").parse()?;
        let regex = RegexBuilder::new(&ascii_classes(&self.pattern))
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .build()?;
        Ok(CompiledOutboundRule {
            regex,
            global: flags.global,
        })
    }
}

/// Rewrite `\d`, `\w` and `\b` (and their negations) to their ASCII forms.
/// Rule patterns are written for a dialect where these classes never match
/// non-ASCII text; `\s` stays Unicode-aware in both.
fn ascii_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    out.push(c);
                    break;
                };
                let replacement = match (escaped, in_class) {
                    ('d', false) => "[0-9]",
                    ('D', false) => "[^0-9]",
                    ('w', false) => "[0-9A-Za-z_]",
                    ('W', false) => "[^0-9A-Za-z_]",
                    ('b', false) => "(?-u:\\b)",
                    ('B', false) => "(?-u:\\B)",
                    ('d', true) => "0-9",
                    ('D', true) => "[^0-9]",
                    ('w', true) => "0-9A-Za-z_",
                    ('W', true) => "[^0-9A-Za-z_]",
                    // Backspace inside a class.
                    ('b', true) => "\\x08",
                    _ => {
                        out.push(c);
                        out.push(escaped);
                        continue;
                    },
                };
                out.push_str(replacement);
            },
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            },
            ']' if in_class => {
                in_class = false;
                out.push(c);
            },
            _ => out.push(c),
        }
    }
    out
}

/// A rule whose pattern compiled successfully.
#[derive(Debug, Clone)]
pub struct CompiledOutboundRule {
    pub regex: Regex,
    /// Replace every match instead of only the first.
    pub global: bool,
}

/// Parsed flag letters of an [`OutboundRegexRule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub global: bool,
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_all: bool,
}

impl FromStr for RegexFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut flags = Self::default();
        let mut seen = String::with_capacity(s.len());
        for flag in s.chars() {
            if seen.contains(flag) {
                return Err(Error::DuplicateRegexFlag { flag });
            }
            seen.push(flag);
            match flag {
                'g' => flags.global = true,
                'i' => flags.case_insensitive = true,
                'm' => flags.multi_line = true,
                's' => flags.dot_all = true,
                // Unicode matching is always on; match indices are not exposed.
                // Sticky matching has no effect since rules scan the whole text.
                'u' | 'v' | 'd' | 'y' => {},
                _ => return Err(Error::InvalidRegexFlag { flag }),
            }
        }
        Ok(flags)
    }
}
