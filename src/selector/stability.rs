//! Pattern tables deciding whether an id or class token is stable enough to
//! anchor a selector. Each entry is `(pattern, rejection reason)`; the first
//! matching entry wins.

use regex::Regex;
use std::sync::LazyLock;

pub type PatternTable = Vec<(Regex, &'static str)>;

fn table(entries: &[(&str, &'static str)]) -> PatternTable {
    entries
        .iter()
        .map(|(pattern, reason)| {
            (
                Regex::new(pattern).expect("stability pattern must compile"),
                *reason,
            )
        })
        .collect()
}

/// Applies to ids and to class tokens
pub static UNSTABLE_ID_PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| {
    table(&[
        (r"^[a-f0-9]{8,}$", "hex digest"),
        (r"^\d+$", "purely numeric"),
        (r"^(react|vue|ng)-", "framework-generated prefix"),
        (r"_\d+$", "trailing counter"),
        (r"^generated", "generated prefix"),
    ])
});

/// Applies to class tokens only
pub static GENERATED_CLASS_PATTERNS: LazyLock<PatternTable> = LazyLock::new(|| {
    table(&[
        (r"(^|[-_])[a-fA-F0-9]{6,}$", "long hex string"),
        (r"__[A-Za-z0-9-]{4,}$", "css-module suffix"),
        (r"^sc-[A-Za-z0-9]+$", "styled-components hash"),
        (r"^(?:[A-Z][a-z0-9]+){4,}$", "long PascalCase"),
        (r"^\d", "leading digit"),
    ])
});

fn first_match(patterns: &PatternTable, token: &str) -> Option<&'static str> {
    patterns
        .iter()
        .find(|(re, _)| re.is_match(token))
        .map(|(_, reason)| *reason)
}

/// Why an id should be skipped, if it should
pub fn unstable_id_reason(id: &str) -> Option<&'static str> {
    if id.trim().is_empty() {
        return Some("empty");
    }
    first_match(&UNSTABLE_ID_PATTERNS, id)
}

pub fn is_stable_id(id: &str) -> bool {
    unstable_id_reason(id).is_none()
}

/// Why a class token should be skipped, if it should
pub fn unstable_class_reason(class: &str) -> Option<&'static str> {
    if class.trim().is_empty() {
        return Some("empty");
    }
    first_match(&UNSTABLE_ID_PATTERNS, class).or_else(|| first_match(&GENERATED_CLASS_PATTERNS, class))
}

pub fn is_stable_class(class: &str) -> bool {
    unstable_class_reason(class).is_none()
}

/// Stable classes in their original order
pub fn stable_classes(classes: &[String]) -> Vec<&str> {
    classes
        .iter()
        .map(|c| c.as_str())
        .filter(|c| is_stable_class(c))
        .collect()
}
