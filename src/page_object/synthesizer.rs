use std::collections::{BTreeMap, HashMap, HashSet};

use crate::codegen::locator::{js_string, locator_expression};
use crate::models::{
    Action, ActionKind, ActionRecord, ElementBinding, MethodParam, PageObjectDescriptor,
    PageObjectMethod,
};

use super::naming::{camel_case, element_base, element_name, page_key, pascal_case, words};

/// Body-token overlap above which two methods are folded into one
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

const MERGE_SUFFIXES: &[&str] = &["Button", "Link", "Field"];

/// Actions recorded on one logical page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageGroup {
    pub key: String,
    /// First URL seen for the page
    pub url: String,
    pub records: Vec<ActionRecord>,
}

/// Group records by page key, in first-seen order within each page
pub fn group_by_page(records: &[ActionRecord]) -> BTreeMap<String, PageGroup> {
    let mut groups: BTreeMap<String, PageGroup> = BTreeMap::new();
    for record in records {
        add_to_groups(&mut groups, record.clone());
    }
    groups
}

pub fn add_to_groups(groups: &mut BTreeMap<String, PageGroup>, record: ActionRecord) {
    let url = match &record.action {
        Action::Navigation { url } => url.clone(),
        _ => record.page_url.clone(),
    };
    let key = page_key(&url);
    let group = groups.entry(key.clone()).or_insert_with(|| PageGroup {
        key,
        url,
        records: Vec::new(),
    });
    group.records.push(record);
}

/// Builds one page object per page group
#[derive(Debug, Clone, Default)]
pub struct PageObjectSynthesizer;

impl PageObjectSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub fn synthesize(&self, groups: &BTreeMap<String, PageGroup>) -> Vec<PageObjectDescriptor> {
        groups.values().map(|group| self.synthesize_page(group)).collect()
    }

    pub fn synthesize_page(&self, group: &PageGroup) -> PageObjectDescriptor {
        let mut page = PageObjectDescriptor::new(group.key.clone(), group.url.clone());
        let mut names_by_target: HashMap<(String, String), String> = HashMap::new();
        let mut methods: Vec<PageObjectMethod> = Vec::new();

        for record in group.records.iter().filter(|r| !r.is_synthetic_wait()) {
            let binding = bind_element(&mut page, &mut names_by_target, record);
            let method = infer_method(record, binding.as_deref());
            merge_by_base_name(&mut methods, method);
        }

        page.methods = merge_similar(methods);
        tracing::debug!(
            "Synthesized {} with {} elements and {} methods",
            page.name,
            page.elements.len(),
            page.methods.len()
        );
        page
    }
}

/// Binding for the record's element, deduplicated by (selector, tag)
fn bind_element(
    page: &mut PageObjectDescriptor,
    names_by_target: &mut HashMap<(String, String), String>,
    record: &ActionRecord,
) -> Option<String> {
    let selector = record.selector.as_ref()?;
    let element = record.element.as_ref()?;
    let target = (selector.selector.clone(), element.tag_name.clone());

    if let Some(name) = names_by_target.get(&target) {
        return Some(name.clone());
    }

    let base = element_name(element);
    let mut name = base.clone();
    let mut n = 2;
    while page.elements.contains_key(&name) {
        name = format!("{}{}", base, n);
        n += 1;
    }

    page.elements.insert(
        name.clone(),
        ElementBinding {
            name: name.clone(),
            selector: selector.selector.clone(),
            tag: element.tag_name.clone(),
            description: format!("{} {}", element.tag_name, element.display_name()),
            locator: locator_expression("this.page", &selector.selector, selector.kind),
        },
    );
    names_by_target.insert(target, name.clone());
    Some(name)
}

fn string_param(name: &str, description: String) -> MethodParam {
    MethodParam {
        name: name.to_string(),
        param_type: "string".to_string(),
        description,
        default: None,
    }
}

/// Method for a single record, by precedence: navigation, submit click,
/// text click, input, select, then `perform<Kind>`
fn infer_method(record: &ActionRecord, binding: Option<&str>) -> PageObjectMethod {
    let field = record
        .element
        .as_ref()
        .map(element_base)
        .filter(|b| !b.is_empty())
        .or_else(|| binding.map(|b| b.to_string()))
        .unwrap_or_else(|| "value".to_string());
    let target = binding
        .map(|b| format!("this.{}", b))
        .unwrap_or_else(|| "this.page".to_string());
    let text = record
        .element
        .as_ref()
        .map(|e| e.text_content.trim().to_string())
        .unwrap_or_default();

    let mut method = match &record.action {
        Action::Navigation { .. } => {
            let mut m = PageObjectMethod::new("navigateToPage");
            m.body.push("await this.page.goto(this.url);".to_string());
            m
        }
        Action::Click if record.targets_submit_control() => {
            let mut m = PageObjectMethod::new("submitForm");
            m.body.push(format!("await {}.click();", target));
            m
        }
        Action::Click if !text.is_empty() => {
            let label: String = words(&text).into_iter().take(4).collect::<Vec<_>>().join(" ");
            let mut m = PageObjectMethod::new(format!("click{}", pascal_case(&label)));
            m.body.push(format!("await {}.click();", target));
            m
        }
        Action::Input { .. } => {
            let param = camel_case(&field);
            let mut m = PageObjectMethod::new(format!("enter{}", pascal_case(&field)));
            m.body.push(format!("await {}.fill({});", target, param));
            m.params.push(string_param(&param, format!("Value for {}", field)));
            m
        }
        Action::Select { .. } => {
            let param = camel_case(&field);
            let mut m = PageObjectMethod::new(format!("select{}", pascal_case(&field)));
            m.body.push(format!("await {}.selectOption({});", target, param));
            m.params.push(string_param(&param, format!("Option for {}", field)));
            m
        }
        other => {
            let kind = other.kind();
            let mut m = PageObjectMethod::new(format!("perform{}", pascal_case(kind.as_str())));
            m.body.push(perform_statement(other, &target));
            m
        }
    };
    method.action_count = 1;
    method
}

fn perform_statement(action: &Action, target: &str) -> String {
    match action {
        Action::Click => format!("await {}.click();", target),
        Action::Hover => format!("await {}.hover();", target),
        Action::Keypress { key } => format!("await this.page.keyboard.press({});", js_string(key)),
        Action::Submit => format!(
            "await {}.evaluate((form) => (form as HTMLFormElement).requestSubmit());",
            target
        ),
        Action::ApiCall { url, .. } => format!(
            "await this.page.waitForResponse((response) => response.url().includes({}));",
            js_string(url)
        ),
        other => format!("// {}", other.kind()),
    }
}

/// Method name with trailing digits and a Button/Link/Field suffix removed
pub fn base_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
    MERGE_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .unwrap_or(trimmed)
}

fn absorb(into: &mut PageObjectMethod, other: PageObjectMethod) {
    for param in other.params {
        if !into.params.iter().any(|p| p.name == param.name) {
            into.params.push(param);
        }
    }
    into.body.extend(other.body);
    into.action_count += other.action_count;
}

/// Fold `method` into an existing method with the same base name, or append it
pub fn merge_by_base_name(methods: &mut Vec<PageObjectMethod>, method: PageObjectMethod) {
    let base = base_name(&method.name).to_string();
    match methods.iter_mut().find(|m| base_name(&m.name) == base) {
        Some(existing) => absorb(existing, method),
        None => methods.push(method),
    }
}

fn body_tokens(method: &PageObjectMethod) -> HashSet<String> {
    method
        .body_text()
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Jaccard similarity of the methods' whitespace-split, lowercased bodies
pub fn jaccard(a: &PageObjectMethod, b: &PageObjectMethod) -> f64 {
    let ta = body_tokens(a);
    let tb = body_tokens(b);
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}

fn generic_name(a: &str, b: &str, taken: &[PageObjectMethod]) -> String {
    let wa = words(a);
    let wb = words(b);
    let common: Vec<&String> = wa
        .iter()
        .zip(wb.iter())
        .take_while(|(x, y)| x.eq_ignore_ascii_case(y))
        .map(|(x, _)| x)
        .collect();

    let base = if common.is_empty() {
        "performActions".to_string()
    } else {
        let prefix = common.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(" ");
        camel_case(&format!("{} actions", prefix))
    };

    let mut name = base.clone();
    let mut n = 2;
    while taken.iter().any(|m| m.name == name) {
        name = format!("{}{}", base, n);
        n += 1;
    }
    name
}

/// Repeatedly merge the first pair of methods whose bodies overlap by more
/// than [`SIMILARITY_THRESHOLD`], replacing both with one generically named
/// method at the earlier position.
pub fn merge_similar(mut methods: Vec<PageObjectMethod>) -> Vec<PageObjectMethod> {
    loop {
        let pair = (0..methods.len()).find_map(|i| {
            (i + 1..methods.len())
                .find(|&j| jaccard(&methods[i], &methods[j]) > SIMILARITY_THRESHOLD)
                .map(|j| (i, j))
        });
        let Some((i, j)) = pair else {
            return methods;
        };

        let second = methods.remove(j);
        let name = generic_name(&methods[i].name, &second.name, &methods);
        tracing::debug!(
            "Merging similar methods {} and {} into {}",
            methods[i].name,
            second.name,
            name
        );
        absorb(&mut methods[i], second);
        methods[i].name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementDescriptor, SelectorKind, SelectorResult};

    fn method(name: &str, body: &[&str]) -> PageObjectMethod {
        let mut m = PageObjectMethod::new(name);
        m.body = body.iter().map(|s| s.to_string()).collect();
        m.action_count = 1;
        m
    }

    #[test]
    fn test_base_name_strips_suffix_and_digits() {
        assert_eq!(base_name("clickSaveButton2"), "clickSave");
        assert_eq!(base_name("clickHomeLink"), "clickHome");
        assert_eq!(base_name("enterEmailField"), "enterEmail");
        assert_eq!(base_name("submitForm"), "submitForm");
    }

    #[test]
    fn test_collision_merge_unions_params() {
        let mut a = method("enterEmail", &["await this.emailInput.fill(email);"]);
        a.params.push(string_param("email", "Value for email".to_string()));
        let mut b = method("enterEmailField", &["await this.emailInput2.fill(email);"]);
        b.params.push(string_param("email", "Value for email".to_string()));

        let mut methods = Vec::new();
        merge_by_base_name(&mut methods, a);
        merge_by_base_name(&mut methods, b);

        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].params.len(), 1);
        assert_eq!(methods[0].body.len(), 2);
        assert_eq!(methods[0].action_count, 2);
    }

    #[test]
    fn test_similar_bodies_merge_under_generic_name() {
        let body = &[
            "await this.page.keyboard.press('Tab');",
            "await this.page.keyboard.press('Tab');",
        ];
        let merged = merge_similar(vec![
            method("performKeypress", body),
            method("performTab", body),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "performActions");
        assert_eq!(merged[0].action_count, 2);
    }

    #[test]
    fn test_dissimilar_bodies_stay_apart() {
        let merged = merge_similar(vec![
            method("enterUser", &["await this.userInput.fill(user);"]),
            method("enterPass", &["await this.passInput.fill(pass);"]),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_duplicate_targets_share_binding() {
        let element = ElementDescriptor::new("button").with_id("save").with_attribute("type", "button");
        let record = |t| {
            ActionRecord::new(t, "http://localhost/editor", Action::Click).with_target(
                SelectorResult::validated("#save", SelectorKind::Id, 0.8),
                element.clone(),
            )
        };
        let groups = group_by_page(&[record(0), record(500)]);
        let page = PageObjectSynthesizer::new().synthesize_page(&groups["EditorPage"]);
        assert_eq!(page.elements.len(), 1);
        assert!(page.elements.contains_key("saveButton"));
    }
}
