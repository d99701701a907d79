use serde::{Deserialize, Serialize};
use std::fmt;

/// Locator kind, in the vocabulary the emitted code understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    DataAttribute,
    Id,
    Name,
    Role,
    RoleText,
    Text,
    Placeholder,
    Css,
    Xpath,
    Composite,
    LabelAssociation,
    TableCell,
    TableText,
    ListItem,
    ShadowDom,
    Relative,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::DataAttribute => "data-attribute",
            SelectorKind::Id => "id",
            SelectorKind::Name => "name",
            SelectorKind::Role => "role",
            SelectorKind::RoleText => "role-text",
            SelectorKind::Text => "text",
            SelectorKind::Placeholder => "placeholder",
            SelectorKind::Css => "css",
            SelectorKind::Xpath => "xpath",
            SelectorKind::Composite => "composite",
            SelectorKind::LabelAssociation => "label-association",
            SelectorKind::TableCell => "table-cell",
            SelectorKind::TableText => "table-text",
            SelectorKind::ListItem => "list-item",
            SelectorKind::ShadowDom => "shadow-dom",
            SelectorKind::Relative => "relative",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked locator with up to two fallbacks.
///
/// `validated` is false only for the last-resort composite and the
/// positional XPath produced after an evaluation failure; every other result
/// has resolved to exactly the original element on the live page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorResult {
    pub selector: String,
    pub kind: SelectorKind,
    pub confidence: f64,
    #[serde(default)]
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<SelectorResult>,
}

impl SelectorResult {
    pub const MAX_FALLBACKS: usize = 2;

    pub fn validated(selector: impl Into<String>, kind: SelectorKind, confidence: f64) -> Self {
        Self {
            selector: selector.into(),
            kind,
            confidence,
            validated: true,
            fallbacks: Vec::new(),
        }
    }

    pub fn unvalidated(selector: impl Into<String>, kind: SelectorKind, confidence: f64) -> Self {
        Self {
            selector: selector.into(),
            kind,
            confidence,
            validated: false,
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<SelectorResult>) -> Self {
        self.fallbacks = fallbacks.into_iter().take(Self::MAX_FALLBACKS).collect();
        self
    }
}

impl fmt::Display for SelectorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {:.2})", self.selector, self.kind, self.confidence)
    }
}
