/// Replace `${ENV_VAR}` and `${ENV_VAR:-default}` placeholders in raw config text.
///
/// Unresolvable variables without a default are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Same as [`substitute_env`] with a custom lookup, so tests don't touch the
/// process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: emit the remainder literally.
            result.push_str(&rest[start..]);
            return result;
        };
        let body = &after[..end];
        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        match (name.is_empty(), lookup(name), default) {
            (false, Some(value), _) if !value.is_empty() || default.is_none() => {
                result.push_str(&value)
            },
            (false, _, Some(default)) => result.push_str(default),
            _ => {
                result.push_str("${");
                result.push_str(body);
                result.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "COURIER_TEST_PREFIX" => Some("[Bot]".to_string()),
            "COURIER_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("prefix = \"${COURIER_TEST_PREFIX}\"", lookup),
            "prefix = \"[Bot]\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${COURIER_NONEXISTENT_XYZ}", lookup),
            "${COURIER_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(substitute_env_with("${COURIER_MISSING:-NO_REPLY}", lookup), "NO_REPLY");
        assert_eq!(substitute_env_with("${COURIER_EMPTY:-fallback}", lookup), "fallback");
    }

    #[test]
    fn known_var_beats_default() {
        assert_eq!(substitute_env_with("${COURIER_TEST_PREFIX:-x}", lookup), "[Bot]");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN b", lookup), "a ${OPEN b");
    }

    #[test]
    fn regex_dollar_refs_untouched() {
        assert_eq!(substitute_env_with("replacement = \"$2 $1\"", lookup), "replacement = \"$2 $1\"");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
