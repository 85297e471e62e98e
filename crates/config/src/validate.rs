//! Configuration validation engine.
//!
//! Validates TOML configuration against the known schema, detects
//! unknown/misspelled fields, and checks outbound regex rules and the
//! response prefix template before they reach the reply pipeline.

use std::{collections::HashMap, path::Path};

use crate::schema::{CourierConfig, RESPONSE_PREFIX_VARIABLES};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "outbound-regex",
    /// "prefix-template", "silent-token", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "messages.outbound_regex[0].pattern"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Array(Box<KnownKeys>),
    Leaf,
}

/// Mirrors every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Struct};

    let rule = Struct(HashMap::from([
        ("pattern", Leaf),
        ("replacement", Leaf),
        ("flags", Leaf),
    ]));

    Struct(HashMap::from([
        (
            "messages",
            Struct(HashMap::from([
                ("response_prefix", Leaf),
                ("silent_token", Leaf),
                ("strip_heartbeat", Leaf),
                ("outbound_regex", Array(Box::new(rule))),
            ])),
        ),
        (
            "identity",
            Struct(HashMap::from([("name", Leaf)])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance`, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let is_toml = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .is_none_or(|e| e == "toml");
            let mut result = if is_toml {
                validate_toml_str(&content)
            } else {
                validate_other_format(&content, actual_path)
            };
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<CourierConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// YAML and JSON files get the semantic checks only.
fn validate_other_format(content: &str, path: &Path) -> ValidationResult {
    let mut diagnostics = Vec::new();
    match crate::loader::parse_config(content, path) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: e.to_string(),
        }),
    }
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                    continue;
                }
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            }
        },
        (toml::Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                let path = format!("{prefix}[{i}]");
                check_unknown_fields(item, item_schema, &path, diagnostics);
            }
        },
        // Leaf or type mismatch; type errors are reported by deserialization.
        _ => {},
    }
}

fn check_semantic_warnings(config: &CourierConfig, diagnostics: &mut Vec<Diagnostic>) {
    for (i, rule) in config.messages.outbound_regex.iter().enumerate() {
        let path = format!("messages.outbound_regex[{i}]");
        if rule.pattern.is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "outbound-regex",
                path: format!("{path}.pattern"),
                message: "empty pattern matches between every character".into(),
            });
        }
        if let Err(e) = rule.compile() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "outbound-regex",
                path,
                message: format!("rule will be skipped at runtime: {e}"),
            });
        }
    }

    if let Some(ref template) = config.messages.response_prefix {
        for name in template_variables(template) {
            if RESPONSE_PREFIX_VARIABLES.contains(&name.to_ascii_lowercase().as_str()) {
                continue;
            }
            let message = match suggest(&name.to_ascii_lowercase(), RESPONSE_PREFIX_VARIABLES, 2)
            {
                Some(s) => format!("unknown template variable {{{name}}} (did you mean {{{s}}}?)"),
                None => format!("unknown template variable {{{name}}} is left as-is"),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "prefix-template",
                path: "messages.response_prefix".into(),
                message,
            });
        }
    }

    if let Some(ref token) = config.messages.silent_token
        && token.trim().is_empty()
    {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "silent-token",
            path: "messages.silent_token".into(),
            message: "blank silent token is ignored; NO_REPLY is used instead".into(),
        });
    }
}

/// Names inside `{...}` placeholders of a prefix template.
fn template_variables(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let name = after[..close].trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
        rest = &after[close + 1..];
    }
    names
}

// ── Tests ───────────────────────────────────────────────────────────────────
