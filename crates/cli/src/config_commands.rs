use std::path::Path;

use {
    anyhow::Result,
    courier_config::{Severity, ValidationResult, validate},
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn handle_validate(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = validate::validate(path);

    match result.config_path {
        Some(ref path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    for line in render(&result, verbose) {
        eprintln!("{line}");
    }

    if result.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// One line per shown diagnostic, then a summary line.
fn render(result: &ValidationResult, verbose: bool) -> Vec<String> {
    let mut lines: Vec<String> = result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .map(|d| {
            let (color, label) = match d.severity {
                Severity::Error => (RED, "error"),
                Severity::Warning => (YELLOW, "warning"),
                Severity::Info => (CYAN, "info"),
            };
            if d.path.is_empty() {
                format!("  {BOLD}{color}{label}{RESET} {}", d.message)
            } else {
                format!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message)
            }
        })
        .collect();

    if !lines.is_empty() {
        lines.push(String::new());
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        lines.push("No issues found.".into());
    } else {
        lines.push(format!("{errors} error(s), {warnings} warning(s)"));
    }
    lines
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_config_reports_no_issues() {
        let result = validate::validate_toml_str("[messages]\nresponse_prefix = \"[Bot]\"\n");
        assert_eq!(render(&result, false), vec!["No issues found.".to_string()]);
    }

    #[test]
    fn bad_rule_is_reported_as_error() {
        let result = validate::validate_toml_str(
            "[[messages.outbound_regex]]\npattern = \"[unclosed\"\nreplacement = \"\"\n",
        );
        let lines = render(&result, false);
        assert!(lines.iter().any(|l| l.contains("error") && l.contains("outbound_regex")));
        assert!(lines.last().unwrap().starts_with("1 error(s)"));
    }

    #[test]
    fn validates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.toml");
        std::fs::write(&path, "[messages]\nstrip_heartbeat = \"yes\"\n").unwrap();
        let result = validate::validate(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
