/// Crate-wide result type for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },

    /// Outbound regex flag outside the supported set.
    #[error("invalid regex flag '{flag}'")]
    InvalidRegexFlag { flag: char },

    #[error("duplicate regex flag '{flag}'")]
    DuplicateRegexFlag { flag: char },

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl courier_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

courier_common::impl_context!();
