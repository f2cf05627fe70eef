use regex::Regex;
use std::sync::OnceLock;

/// Syntactic email check: local part, `@`, and a dotted domain whose labels
/// do not start or end with a hyphen.
pub fn is_valid_email(candidate: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
        )
        .ok()
    });

    if candidate.len() > 254 {
        return false;
    }
    let Some((local, _)) = candidate.rsplit_once('@') else {
        return false;
    };
    if local.len() > 64 || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    pattern
        .as_ref()
        .map(|pattern| pattern.is_match(candidate))
        .unwrap_or(false)
}
