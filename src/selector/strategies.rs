//! Candidate builders, one per strategy, and the table that fixes the order
//! they are tried in.

use crate::config::SelectorOptions;
use crate::models::{ElementDescriptor, SelectorKind};

use super::stability::{is_stable_id, stable_classes};

/// A selector that has not yet been checked against the live page
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub selector: String,
    pub kind: SelectorKind,
    pub confidence: f64,
}

impl Candidate {
    fn new(selector: impl Into<String>, kind: SelectorKind, confidence: f64) -> Self {
        Self {
            selector: selector.into(),
            kind,
            confidence,
        }
    }
}

type Builder = fn(&ElementDescriptor, &SelectorOptions) -> Vec<Candidate>;

/// Strategies in the order they are tried, highest confidence first
pub const STRATEGIES: &[(&str, Builder)] = &[
    ("preferred-attribute", preferred_attribute),
    ("id", stable_id),
    ("label-association", label_association),
    ("name", name_attribute),
    ("role-text", role_text),
    ("role", role_only),
    ("text", text_content),
    ("placeholder", placeholder),
    ("table", table_cell),
    ("list-item", list_item),
    ("shadow-dom", shadow_dom),
    ("css", css_combination),
    ("relative", relative),
    ("xpath", xpath),
];

/// Strategies fallbacks are drawn from, in the order they are tried
pub const FALLBACK_STRATEGIES: &[(&str, Builder)] = &[
    ("xpath", xpath),
    ("css", css_combination),
    ("text", text_content),
];

const SEMANTIC_TEXT_TAGS: &[&str] = &["button", "a", "label", "span"];

/// All candidates for an element, in trial order, without duplicates
pub fn ordered_candidates(element: &ElementDescriptor, options: &SelectorOptions) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    for (_, build) in STRATEGIES {
        for candidate in build(element, options) {
            if !out.iter().any(|c| c.selector == candidate.selector) {
                out.push(candidate);
            }
        }
    }
    out
}

// ============================================================================
// Quoting helpers
// ============================================================================

/// Escape a value for use inside a double-quoted CSS attribute selector
pub fn css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `#id` when the id is a plain identifier, `[id="..."]` otherwise
pub fn css_id(id: &str) -> String {
    let plain = id
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if plain {
        format!("#{}", id)
    } else {
        format!("[id=\"{}\"]", css_string(id))
    }
}

/// XPath string literal, falling back to `concat()` when both quote kinds appear
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", css_string(value))
}

// ============================================================================
// Builders
// ============================================================================

fn preferred_attribute(element: &ElementDescriptor, options: &SelectorOptions) -> Vec<Candidate> {
    let mut out = Vec::new();
    for attribute in &options.preferred_attributes {
        if attribute == "id" {
            out.extend(stable_id(element, options));
        } else if let Some(value) = element.attribute(attribute) {
            out.push(Candidate::new(
                format!("[{}={}]", attribute, quoted(value)),
                SelectorKind::DataAttribute,
                0.9,
            ));
        }
    }
    out
}

fn stable_id(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if element.id.is_empty() || !is_stable_id(&element.id) {
        return Vec::new();
    }
    vec![Candidate::new(css_id(&element.id), SelectorKind::Id, 0.8)]
}

fn label_association(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if !element.is_form_field() {
        return Vec::new();
    }
    match &element.label {
        Some(label) if !label.text.is_empty() => vec![Candidate::new(
            format!("internal:label={}", quoted(&label.text)),
            SelectorKind::LabelAssociation,
            0.85,
        )],
        _ => Vec::new(),
    }
}

fn name_attribute(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if element.name.is_empty() || !element.is_form_field() {
        return Vec::new();
    }
    vec![Candidate::new(
        format!("{}[name={}]", element.tag_name, quoted(&element.name)),
        SelectorKind::Name,
        0.7,
    )]
}

fn role_text(element: &ElementDescriptor, options: &SelectorOptions) -> Vec<Candidate> {
    if element.role.is_empty() {
        return Vec::new();
    }
    let mut names = Vec::new();
    if !element.aria_label.is_empty() {
        names.push(element.aria_label.as_str());
    }
    let text = element.text_content.as_str();
    if !text.is_empty() && text.chars().count() <= options.max_text_length {
        names.push(text);
    }
    names
        .into_iter()
        .map(|name| {
            Candidate::new(
                format!("role={}[name={}]", element.role, quoted(name)),
                SelectorKind::RoleText,
                0.75,
            )
        })
        .collect()
}

fn role_only(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if element.role.is_empty() {
        return Vec::new();
    }
    vec![Candidate::new(
        format!("role={}", element.role),
        SelectorKind::Role,
        0.6,
    )]
}

fn text_content(element: &ElementDescriptor, options: &SelectorOptions) -> Vec<Candidate> {
    let text = element.text_content.as_str();
    if text.is_empty() || text.chars().count() > options.max_text_length {
        return Vec::new();
    }
    let mut out = Vec::new();
    if SEMANTIC_TEXT_TAGS.contains(&element.tag_name.as_str()) {
        out.push(Candidate::new(
            format!("{}:has-text({})", element.tag_name, quoted(text)),
            SelectorKind::Text,
            0.65,
        ));
    }
    out.push(Candidate::new(
        format!("text={}", quoted(text)),
        SelectorKind::Text,
        0.5,
    ));
    out
}

fn placeholder(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    match element.placeholder() {
        Some(value) => vec![Candidate::new(
            format!("{}[placeholder={}]", element.tag_name, quoted(value)),
            SelectorKind::Placeholder,
            0.6,
        )],
        None => Vec::new(),
    }
}

/// The part of a table/list selector that reaches from the container cell
/// down to the element itself
fn inner_suffix(element: &ElementDescriptor, container_tags: &[&str]) -> String {
    if container_tags.contains(&element.tag_name.as_str()) {
        String::new()
    } else {
        format!(" >> {}", element.tag_name)
    }
}

fn table_cell(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    let Some(cell) = &element.table_cell else {
        return Vec::new();
    };
    let table = if cell.table_selector.is_empty() {
        "table"
    } else {
        cell.table_selector.as_str()
    };
    let inner = inner_suffix(element, &["td", "th"]);
    let mut out = Vec::new();
    if cell.row > 0 && cell.column > 0 {
        out.push(Candidate::new(
            format!(
                "{} tr:nth-of-type({}) > :nth-child({}){}",
                table, cell.row, cell.column, inner
            ),
            SelectorKind::TableCell,
            0.55,
        ));
    }
    if !cell.cell_text.is_empty() && cell.cell_text.chars().count() <= 50 {
        out.push(Candidate::new(
            format!("{} td:has-text({}){}", table, quoted(&cell.cell_text), inner),
            SelectorKind::TableText,
            0.5,
        ));
    }
    out
}

fn list_item(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    let Some(item) = &element.list_item else {
        return Vec::new();
    };
    if item.position == 0 {
        return Vec::new();
    }
    let base = if item.list_selector.is_empty() {
        format!("li:nth-of-type({})", item.position)
    } else {
        format!("{} > li:nth-of-type({})", item.list_selector, item.position)
    };
    vec![Candidate::new(
        format!("{}{}", base, inner_suffix(element, &["li"])),
        SelectorKind::ListItem,
        0.45,
    )]
}

/// A selector for the element that does not reach outside its own tree
fn local_selector(element: &ElementDescriptor) -> String {
    if !element.id.is_empty() && is_stable_id(&element.id) {
        return css_id(&element.id);
    }
    if let Some(value) = element.attribute("data-testid") {
        return format!("[data-testid={}]", quoted(value));
    }
    let classes = stable_classes(&element.class_list);
    if classes.is_empty() {
        element.tag_name.clone()
    } else {
        format!("{}.{}", element.tag_name, classes[..classes.len().min(2)].join("."))
    }
}

fn shadow_dom(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if !element.in_shadow_dom() {
        return Vec::new();
    }
    let mut path: Vec<String> = element.shadow_hosts.clone();
    path.push(local_selector(element));
    vec![Candidate::new(
        path.join(" >> "),
        SelectorKind::ShadowDom,
        0.5,
    )]
}

fn css_combination(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if element.tag_name.is_empty() {
        return Vec::new();
    }
    let tag = element.tag_name.as_str();
    let classes = stable_classes(&element.class_list);
    let mut out = Vec::new();

    if !classes.is_empty() {
        let joined = classes[..classes.len().min(2)].join(".");
        out.push(format!("{}.{}", tag, joined));
        if !element.parent_id.is_empty() && is_stable_id(&element.parent_id) {
            out.push(format!("{} > {}.{}", css_id(&element.parent_id), tag, joined));
        }
    }
    if let Some(input_type) = element.input_type() {
        out.push(format!("{}[type={}]", tag, quoted(input_type)));
    }
    if !element.parent_id.is_empty() && is_stable_id(&element.parent_id) {
        out.push(format!(
            "{} > {}:nth-of-type({})",
            css_id(&element.parent_id),
            tag,
            element.sibling_index + 1
        ));
    }
    out.push(tag.to_string());

    out.into_iter()
        .map(|s| Candidate::new(s, SelectorKind::Css, 0.4))
        .collect()
}

fn relative(element: &ElementDescriptor, _options: &SelectorOptions) -> Vec<Candidate> {
    if element.tag_name.is_empty() {
        return Vec::new();
    }
    let (ex, ey) = element.bounding_box.center();
    element
        .anchors
        .iter()
        .filter(|a| !a.selector.is_empty())
        .map(|anchor| {
            let (ax, ay) = anchor.bounding_box.center();
            let relation = spatial_relation(ex - ax, ey - ay);
            Candidate::new(
                format!("{}:{}({}) >> nth=0", element.tag_name, relation, anchor.selector),
                SelectorKind::Relative,
                0.3,
            )
        })
        .collect()
}

/// Relation of the element to its anchor along the dominant axis of the
/// positional delta (element minus anchor)
pub fn spatial_relation(dx: f64, dy: f64) -> &'static str {
    if dy.abs() >= dx.abs() {
        if dy >= 0.0 {
            "below"
        } else {
            "above"
        }
    } else if dx >= 0.0 {
        "right-of"
    } else {
        "left-of"
    }
}

fn xpath(element: &ElementDescriptor, options: &SelectorOptions) -> Vec<Candidate> {
    if element.tag_name.is_empty() {
        return Vec::new();
    }
    let mut conditions = Vec::new();
    if !element.id.is_empty() && is_stable_id(&element.id) {
        conditions.push(format!("@id={}", xpath_literal(&element.id)));
    }
    if !element.name.is_empty() {
        conditions.push(format!("@name={}", xpath_literal(&element.name)));
    }
    if let Some(class) = stable_classes(&element.class_list).first() {
        conditions.push(format!(
            "contains(concat(' ', normalize-space(@class), ' '), ' {} ')",
            class
        ));
    }
    let text = element.text_content.as_str();
    if !text.is_empty() && text.chars().count() <= options.max_text_length {
        conditions.push(format!("normalize-space()={}", xpath_literal(text)));
    }
    if conditions.is_empty() {
        return Vec::new();
    }
    vec![Candidate::new(
        format!("xpath=//{}[{}]", element.tag_name, conditions.join(" and ")),
        SelectorKind::Xpath,
        0.3,
    )]
}

/// Last-resort selector from tag, type, name and position. Never validated.
pub fn composite(element: &ElementDescriptor) -> String {
    let mut selector = if element.tag_name.is_empty() {
        "*".to_string()
    } else {
        element.tag_name.clone()
    };
    if let Some(input_type) = element.input_type() {
        selector.push_str(&format!("[type={}]", quoted(input_type)));
    }
    if !element.name.is_empty() {
        selector.push_str(&format!("[name={}]", quoted(&element.name)));
    }
    selector.push_str(&format!(":nth-of-type({})", element.sibling_index + 1));
    selector
}

/// Positional XPath used when the element could not be inspected
pub fn positional_xpath(element: Option<&ElementDescriptor>) -> String {
    match element {
        Some(e) if !e.absolute_xpath.is_empty() => format!("xpath={}", e.absolute_xpath),
        Some(e) if !e.tag_name.is_empty() => {
            format!("xpath=(//{})[{}]", e.tag_name, e.sibling_index + 1)
        }
        _ => "xpath=//body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnchorCandidate, BoundingBox, LabelContext, LabelSource};

    fn options() -> SelectorOptions {
        SelectorOptions::default()
    }

    #[test]
    fn test_data_attribute_precedes_id() {
        let el = ElementDescriptor::new("button")
            .with_id("save")
            .with_attribute("data-testid", "save-btn");
        let candidates = ordered_candidates(&el, &options());
        assert_eq!(candidates[0].selector, r#"[data-testid="save-btn"]"#);
        assert_eq!(candidates[0].kind, SelectorKind::DataAttribute);
        assert_eq!(candidates[1].selector, "#save");
        assert_eq!(candidates[1].kind, SelectorKind::Id);
    }

    #[test]
    fn test_hex_id_never_used() {
        let el = ElementDescriptor::new("div").with_id("deadbeef01");
        let candidates = ordered_candidates(&el, &options());
        assert!(candidates.iter().all(|c| !c.selector.contains("deadbeef01")));
    }

    #[test]
    fn test_generated_classes_filtered_from_css() {
        let el = ElementDescriptor::new("button").with_classes(&["css-a1b2c3d4", "btn"]);
        let css = css_combination(&el, &options());
        assert_eq!(css[0].selector, "button.btn");
        assert!(css.iter().all(|c| !c.selector.contains("css-a1b2c3d4")));
    }

    #[test]
    fn test_label_only_for_form_fields() {
        let label = LabelContext {
            text: "Email".to_string(),
            source: LabelSource::ForAttribute,
        };
        let mut input = ElementDescriptor::new("input");
        input.label = Some(label.clone());
        let mut div = ElementDescriptor::new("div");
        div.label = Some(label);

        assert_eq!(
            label_association(&input, &options())[0].selector,
            r#"internal:label="Email""#
        );
        assert!(label_association(&div, &options()).is_empty());
    }

    #[test]
    fn test_text_respects_max_length() {
        let short = ElementDescriptor::new("button").with_text("Save");
        let long = ElementDescriptor::new("button").with_text(&"word ".repeat(10));
        let texts = text_content(&short, &options());
        assert_eq!(texts[0].selector, r#"button:has-text("Save")"#);
        assert_eq!(texts[0].confidence, 0.65);
        assert_eq!(texts[1].selector, r#"text="Save""#);
        assert!(text_content(&long, &options()).is_empty());
    }

    #[test]
    fn test_name_only_for_form_fields() {
        let input = ElementDescriptor::new("input").with_name("email");
        let anchor = ElementDescriptor::new("a").with_name("top");
        assert_eq!(name_attribute(&input, &options())[0].selector, r#"input[name="email"]"#);
        assert!(name_attribute(&anchor, &options()).is_empty());
    }

    #[test]
    fn test_spatial_relation_uses_dominant_axis() {
        assert_eq!(spatial_relation(5.0, 40.0), "below");
        assert_eq!(spatial_relation(5.0, -40.0), "above");
        assert_eq!(spatial_relation(80.0, 10.0), "right-of");
        assert_eq!(spatial_relation(-80.0, 10.0), "left-of");
    }

    #[test]
    fn test_relative_selector_from_anchor() {
        let mut el = ElementDescriptor::new("input");
        el.bounding_box = BoundingBox {
            x: 10.0,
            y: 60.0,
            width: 100.0,
            height: 20.0,
        };
        el.anchors.push(AnchorCandidate {
            selector: "#email-heading".to_string(),
            text: "Email".to_string(),
            bounding_box: BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 20.0,
            },
        });
        let rel = relative(&el, &options());
        assert_eq!(rel[0].selector, "input:below(#email-heading) >> nth=0");
    }

    #[test]
    fn test_xpath_combines_conditions() {
        let el = ElementDescriptor::new("button")
            .with_id("go")
            .with_classes(&["btn"])
            .with_text("Go");
        let xp = xpath(&el, &options());
        assert_eq!(
            xp[0].selector,
            "xpath=//button[@id='go' and contains(concat(' ', normalize-space(@class), ' '), ' btn ') and normalize-space()='Go']"
        );
    }

    #[test]
    fn test_xpath_literal_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal(r#"a'b"c"#), r#"concat('a', "'", 'b"c')"#);
    }

    #[test]
    fn test_composite_selector() {
        let mut el = ElementDescriptor::new("input")
            .with_attribute("type", "email")
            .with_name("contact");
        el.sibling_index = 1;
        assert_eq!(
            composite(&el),
            r#"input[type="email"][name="contact"]:nth-of-type(2)"#
        );
    }

    #[test]
    fn test_table_cell_candidates() {
        let mut el = ElementDescriptor::new("button");
        el.table_cell = Some(crate::models::TableCellContext {
            table_selector: "#users".to_string(),
            row: 2,
            column: 3,
            cell_text: "Edit".to_string(),
        });
        let cells = table_cell(&el, &options());
        assert_eq!(cells[0].selector, "#users tr:nth-of-type(2) > :nth-child(3) >> button");
        assert_eq!(cells[0].kind, SelectorKind::TableCell);
        assert_eq!(cells[1].selector, r#"#users td:has-text("Edit") >> button"#);
        assert_eq!(cells[1].kind, SelectorKind::TableText);
    }

    #[test]
    fn test_shadow_path() {
        let mut el = ElementDescriptor::new("button").with_id("inner");
        el.shadow_hosts = vec!["app-shell".to_string(), "#settings".to_string()];
        assert_eq!(
            shadow_dom(&el, &options())[0].selector,
            "app-shell >> #settings >> #inner"
        );
    }
}
