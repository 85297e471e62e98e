//! Response prefix templates such as `"[{identity.name} · {model}]"`.
//!
//! Variable names are case insensitive. A variable that is unknown, or known
//! but unset in the context, stays in the output verbatim.

use {courier_config::AgentIdentity, serde::Serialize};

use crate::normalize::PrefixResolver;

/// Values available to a response prefix template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePrefixContext {
    /// Full model id, e.g. `"anthropic/claude-sonnet-4-20250514"`.
    pub model: Option<String>,
    pub provider: Option<String>,
    pub thinking_level: Option<String>,
    pub identity_name: Option<String>,
}

impl ResponsePrefixContext {
    pub fn from_identity(identity: &AgentIdentity) -> Self {
        Self {
            identity_name: identity.name.clone(),
            ..Self::default()
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "model" => self.model.as_deref().map(short_model_name),
            "modelfull" => self.model.clone(),
            "provider" => self.provider.clone(),
            "thinkinglevel" | "think" => self.thinking_level.clone(),
            "identity.name" | "identityname" => self.identity_name.clone(),
            _ => None,
        }
    }
}

/// Built-in [`PrefixResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePrefixResolver;

impl PrefixResolver for TemplatePrefixResolver {
    fn resolve(&self, template: Option<&str>, context: &ResponsePrefixContext) -> Option<String> {
        resolve_response_prefix_template(template, context)
    }
}

/// Substitute `{variable}` placeholders in `template`.
pub fn resolve_response_prefix_template(
    template: Option<&str>,
    context: &ResponsePrefixContext,
) -> Option<String> {
    let template = template?;
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        match context.lookup(after[..close].trim()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Some(out)
}

/// `"openai/gpt-4o-2024-08-06"` → `"gpt-4o-2024-08-06"`,
/// `"claude-sonnet-4-20250514"` → `"claude-sonnet-4"`, `"foo-latest"` → `"foo"`.
pub fn short_model_name(model: &str) -> String {
    let name = model.rsplit('/').next().unwrap_or(model);
    let name = name.strip_suffix("-latest").unwrap_or(name);
    match name.rsplit_once('-') {
        Some((head, date)) if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) => {
            head.to_string()
        },
        _ => name.to_string(),
    }
}
