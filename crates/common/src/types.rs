//! Reply payload shared between the normalizer, channels and the CLI.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

use crate::Result;

/// One candidate outbound message.
///
/// `text` is optional: media-only and channel-data-only replies are valid.
/// `channel_data` is keyed by channel name (`"line"`, `"telegram"`, ...) and
/// carries structured content outside the plain-text body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub channel_data: Map<String, Value>,
    /// The reply describes a failure (provider error, tool crash, ...).
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reply_to_current: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub audio_as_voice: bool,
    /// Fields this crate doesn't model, passed through to delivery untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ReplyPayload {
    /// Text-only payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// True if a single media reference or a non-empty media list is present.
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.media_url.as_deref().is_some_and(|url| !url.is_empty()) || !self.media_urls.is_empty()
    }

    #[must_use]
    pub fn has_channel_data(&self) -> bool {
        !self.channel_data.is_empty()
    }
}
