use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of characters of text content kept on a descriptor
pub const MAX_TEXT_CONTENT: usize = 100;

/// Bounding rectangle of an element in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Label associated with a form control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// `<label for="id">`
    ForAttribute,
    /// `<label><input/></label>`
    Wrapping,
    AriaLabel,
    /// A label-like element immediately before the control
    PrecedingSibling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelContext {
    pub text: String,
    pub source: LabelSource,
}

/// Position of an element inside a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCellContext {
    /// Selector for the owning table (may be empty when the table has no stable hook)
    #[serde(default)]
    pub table_selector: String,
    /// 1-based row index within the table body
    pub row: usize,
    /// 1-based column index
    pub column: usize,
    #[serde(default)]
    pub cell_text: String,
}

/// Position of an element inside a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemContext {
    #[serde(default)]
    pub list_selector: String,
    /// 1-based position of the owning `<li>`
    pub position: usize,
}

/// A nearby element that can anchor a relative selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    pub selector: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

/// Immutable snapshot of a DOM element's observable attributes.
///
/// Every field deserializes with a default so an extraction script that
/// omits an attribute yields an empty value rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementDescriptor {
    pub tag_name: String,
    pub id: String,
    pub class_list: Vec<String>,
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text_content: String,
    pub bounding_box: BoundingBox,
    pub visible: bool,
    /// 0-based index among same-tag siblings
    pub sibling_index: usize,
    pub role: String,
    pub aria_label: String,
    pub parent_tag: String,
    pub parent_class: String,
    pub parent_id: String,
    /// Absolute positional XPath computed in-page
    pub absolute_xpath: String,
    pub label: Option<LabelContext>,
    pub table_cell: Option<TableCellContext>,
    pub list_item: Option<ListItemContext>,
    /// Selectors of the shadow hosts enclosing the element, outermost first
    pub shadow_hosts: Vec<String>,
    pub anchors: Vec<AnchorCandidate>,
}

impl ElementDescriptor {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_lowercase(),
            visible: true,
            ..Default::default()
        }
    }

    /// Normalize a freshly deserialized snapshot: lowercase tag names and
    /// bound the text content.
    pub fn normalized(mut self) -> Self {
        self.tag_name = self.tag_name.to_lowercase();
        self.parent_tag = self.parent_tag.to_lowercase();
        self.text_content = truncate_text(self.text_content.trim(), MAX_TEXT_CONTENT);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn input_type(&self) -> Option<&str> {
        self.attribute("type")
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.attribute("placeholder")
    }

    /// Whether this is an `input`, `select` or `textarea`
    pub fn is_form_field(&self) -> bool {
        matches!(self.tag_name.as_str(), "input" | "select" | "textarea")
    }

    /// Form fields plus buttons; the unit of form-sequence grouping
    pub fn is_form_element(&self) -> bool {
        self.is_form_field() || self.tag_name == "button"
    }

    /// An element counts as a submit control if its type is `submit`, it is a
    /// `button` with no explicit type, or its visible text mentions "submit".
    pub fn is_submit_control(&self) -> bool {
        match self.input_type() {
            Some(t) if t.eq_ignore_ascii_case("submit") => return true,
            None if self.tag_name == "button" => return true,
            _ => {}
        }
        self.text_content.to_lowercase().contains("submit")
    }

    pub fn in_shadow_dom(&self) -> bool {
        !self.shadow_hosts.is_empty()
    }

    /// Identifier a form field is known by: name, id, label, placeholder
    pub fn field_name(&self) -> Option<&str> {
        [
            self.name.as_str(),
            self.id.as_str(),
            self.label.as_ref().map(|l| l.text.as_str()).unwrap_or(""),
            self.placeholder().unwrap_or(""),
            self.aria_label.as_str(),
        ]
        .into_iter()
        .find(|s| !s.trim().is_empty())
    }

    /// Short human-readable label for descriptions
    pub fn display_name(&self) -> String {
        let text = self.text_content.trim();
        if !text.is_empty() && text.chars().count() <= 40 {
            return format!("\"{}\"", text);
        }
        if !self.aria_label.is_empty() {
            return format!("\"{}\"", self.aria_label);
        }
        match self.field_name() {
            Some(name) => format!("{} field", name),
            None => self.tag_name.clone(),
        }
    }

    // Builders, mostly for fixtures

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        self.class_list = classes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text_content = truncate_text(text, MAX_TEXT_CONTENT);
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_aria_label(mut self, label: &str) -> Self {
        self.aria_label = label.to_string();
        self
    }
}

/// Truncate on a char boundary
pub fn truncate_text(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
