//! Playwright expressions for selectors and assertions

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Assertion, SelectorKind};

static ROLE_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^role=([\w-]+)(?:\[name="((?:[^"\\]|\\.)*)"\])?$"#)
        .expect("role selector pattern must compile")
});

static QUOTED_ENGINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:text|internal:label)="((?:[^"\\]|\\.)*)"$"#)
        .expect("engine selector pattern must compile")
});

/// Single-quoted JavaScript string literal
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn css_unescape(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Locator expression on `receiver` (`page` or `this.page`) for a selector
/// of the given kind
pub fn locator_expression(receiver: &str, selector: &str, kind: SelectorKind) -> String {
    match kind {
        SelectorKind::Role | SelectorKind::RoleText => {
            if let Some(caps) = ROLE_SELECTOR.captures(selector) {
                let role = js_string(&caps[1]);
                return match caps.get(2) {
                    Some(name) => format!(
                        "{}.getByRole({}, {{ name: {} }})",
                        receiver,
                        role,
                        js_string(&css_unescape(name.as_str()))
                    ),
                    None => format!("{}.getByRole({})", receiver, role),
                };
            }
        }
        SelectorKind::Text if selector.starts_with("text=") => {
            if let Some(caps) = QUOTED_ENGINE.captures(selector) {
                return format!(
                    "{}.getByText({}, {{ exact: true }})",
                    receiver,
                    js_string(&css_unescape(&caps[1]))
                );
            }
        }
        SelectorKind::LabelAssociation => {
            if let Some(caps) = QUOTED_ENGINE.captures(selector) {
                return format!(
                    "{}.getByLabel({})",
                    receiver,
                    js_string(&css_unescape(&caps[1]))
                );
            }
        }
        _ => {}
    }
    format!("{}.locator({})", receiver, js_string(selector))
}

/// Kind implied by a selector's engine prefix, for selectors stored without
/// their [`SelectorResult`](crate::models::SelectorResult)
pub fn engine_kind(selector: &str) -> SelectorKind {
    if selector.starts_with("role=") {
        if selector.contains("[name=") {
            SelectorKind::RoleText
        } else {
            SelectorKind::Role
        }
    } else if selector.starts_with("text=") {
        SelectorKind::Text
    } else if selector.starts_with("internal:label=") {
        SelectorKind::LabelAssociation
    } else {
        SelectorKind::Css
    }
}

/// `expect(...)` statement for an assertion, against the test's `page`
pub fn assertion_statement(assertion: &Assertion) -> String {
    match assertion {
        Assertion::Url { pattern } => {
            format!("await expect(page).toHaveURL({});", js_string(pattern))
        }
        Assertion::Visible { selector } => format!(
            "await expect({}).toBeVisible();",
            locator_expression("page", selector, engine_kind(selector))
        ),
        Assertion::Value { selector, value } => format!(
            "await expect({}).toHaveValue({});",
            locator_expression("page", selector, engine_kind(selector)),
            js_string(value)
        ),
    }
}
