//! Configuration loading, validation and env substitution.
//!
//! Config files: `courier.toml`, `courier.yaml`, `courier.yml` or `courier.json`,
//! searched in `./` then `~/.config/courier/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        AgentIdentity, CompiledOutboundRule, CourierConfig, MessagesConfig, OutboundRegexRule,
        RESPONSE_PREFIX_VARIABLES, RegexFlags,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
