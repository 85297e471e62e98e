use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::CourierConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "courier.toml",
    "courier.yaml",
    "courier.yml",
    "courier.json",
];

/// Env var overriding `messages.response_prefix` after the file is loaded.
const RESPONSE_PREFIX_ENV: &str = "COURIER_RESPONSE_PREFIX";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<CourierConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./courier.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/courier/courier.{toml,yaml,yml,json}` (user-global)
///
/// Returns `CourierConfig::default()` if no config file is found or the file
/// fails to load.
pub fn discover_and_load() -> CourierConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                CourierConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        CourierConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

/// Apply `COURIER_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut CourierConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut CourierConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(prefix) = lookup(RESPONSE_PREFIX_ENV) {
        debug!(prefix = %prefix, "response prefix overridden from environment");
        config.messages.response_prefix = (!prefix.is_empty()).then_some(prefix);
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/courier/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "courier").map(|d| d.config_dir().to_path_buf())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<CourierConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    fn write_config(name: &str, contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_toml() {
        let (_dir, path) = write_config(
            "courier.toml",
            r#"
[messages]
response_prefix = "[Bot]"
strip_heartbeat = false
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.messages.response_prefix.as_deref(), Some("[Bot]"));
        assert!(!cfg.messages.strip_heartbeat);
    }

    #[test]
    fn loads_yaml() {
        let (_dir, path) = write_config(
            "courier.yaml",
            "messages:\n  outbound_regex:\n    - pattern: foo\n      replacement: bar\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.messages.outbound_regex.len(), 1);
        assert_eq!(cfg.messages.outbound_regex[0].replacement, "bar");
    }

    #[test]
    fn loads_json() {
        let (_dir, path) = write_config(
            "courier.json",
            r#"{"messages":{"silent_token":"SHH"},"identity":{"name":"Ada"}}"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.messages.silent_token.as_deref(), Some("SHH"));
        assert_eq!(cfg.identity.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let (_dir, path) = write_config("courier.ini", "x=1");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
    }

    #[test]
    fn missing_file_mentions_path() {
        let err = load_config(Path::new("/nonexistent/courier.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/courier.toml"));
    }

    #[test]
    fn env_override_replaces_prefix() {
        let mut cfg = CourierConfig::default();
        apply_env_overrides_with(&mut cfg, |name| {
            (name == RESPONSE_PREFIX_ENV).then(|| "[{model}]".to_string())
        });
        assert_eq!(cfg.messages.response_prefix.as_deref(), Some("[{model}]"));
    }

    #[test]
    fn empty_env_override_clears_prefix() {
        let mut cfg = CourierConfig::default();
        cfg.messages.response_prefix = Some("[Bot]".into());
        apply_env_overrides_with(&mut cfg, |_| Some(String::new()));
        assert!(cfg.messages.response_prefix.is_none());
    }
}
