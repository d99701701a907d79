use serde_json::{json, Map, Value};

use crate::codegen::locator::{engine_kind, js_string, locator_expression};
use crate::models::{Action, ActionRecord, Assertion, SelectorKind, StepKind, TestStep, WaitStrategy};

use super::optimizer::{FormSequence, Unit};

/// Convert optimized units into numbered test steps. A network-idle wait
/// directly after a navigation becomes part of the navigation step.
pub fn to_steps(units: &[Unit]) -> Vec<TestStep> {
    let mut steps = Vec::new();
    let mut i = 0;

    while i < units.len() {
        let index = steps.len() + 1;
        match &units[i] {
            Unit::Action { record, expected } => {
                if let Action::Navigation { url } = &record.action {
                    let settle = match units.get(i + 1) {
                        Some(Unit::Action { record: next, .. }) => match &next.action {
                            Action::Wait {
                                strategy: WaitStrategy::NetworkIdle,
                                timeout_ms,
                                ..
                            } => {
                                i += 1;
                                Some(*timeout_ms)
                            }
                            _ => None,
                        },
                        _ => None,
                    };
                    steps.push(navigation_step(index, url, settle, expected));
                } else {
                    steps.push(action_step(index, record));
                }
            }
            Unit::Form(form) => steps.push(form_step(index, form)),
        }
        i += 1;
    }

    steps
}

fn locator(record: &ActionRecord) -> String {
    match &record.selector {
        Some(s) => locator_expression("page", &s.selector, s.kind),
        None => locator_expression("page", "body", SelectorKind::Css),
    }
}

fn target_name(record: &ActionRecord) -> String {
    match (&record.element, record.primary_selector()) {
        (Some(element), _) => element.display_name(),
        (None, Some(selector)) => selector.to_string(),
        (None, None) => "page".to_string(),
    }
}

fn field_name(record: &ActionRecord) -> String {
    record
        .element
        .as_ref()
        .and_then(|e| e.field_name())
        .map(|s| s.to_string())
        .or_else(|| record.primary_selector().map(|s| s.to_string()))
        .unwrap_or_else(|| "field".to_string())
}

fn navigation_step(index: usize, url: &str, settle: Option<u64>, expected: &[String]) -> TestStep {
    let mut code = vec![format!("await page.goto({});", js_string(url))];
    if let Some(timeout) = settle {
        code.push(format!(
            "await page.waitForLoadState('networkidle', {{ timeout: {} }});",
            timeout
        ));
    }

    let mut assertions = vec![Assertion::Url {
        pattern: url.to_string(),
    }];
    assertions.extend(expected.iter().map(|selector| Assertion::Visible {
        selector: selector.clone(),
    }));

    TestStep {
        index,
        kind: StepKind::Navigate,
        description: format!("Navigate to {}", url),
        code: code.join("\n"),
        data: Some(json!({ "url": url })),
        assertions,
        sub_steps: Vec::new(),
    }
}

/// Description, replay statement and data of a single record
fn render(record: &ActionRecord) -> (StepKind, String, String, Option<Value>) {
    let target = locator(record);
    let selector = record.primary_selector().unwrap_or_default();

    match &record.action {
        Action::Navigation { url } => (
            StepKind::Navigate,
            format!("Navigate to {}", url),
            format!("await page.goto({});", js_string(url)),
            Some(json!({ "url": url })),
        ),
        Action::Click => (
            StepKind::Click,
            format!("Click {}", target_name(record)),
            format!("await {}.click();", target),
            None,
        ),
        Action::Input { value } => (
            StepKind::Input,
            format!("Enter \"{}\" into {}", value, field_name(record)),
            format!("await {}.fill({});", target, js_string(value)),
            Some(json!({ "field": field_name(record), "selector": selector, "value": value })),
        ),
        Action::Select { value } => (
            StepKind::Select,
            format!("Select \"{}\" in {}", value, field_name(record)),
            format!("await {}.selectOption({});", target, js_string(value)),
            Some(json!({ "field": field_name(record), "selector": selector, "value": value })),
        ),
        Action::Hover => (
            StepKind::Hover,
            format!("Hover over {}", target_name(record)),
            format!("await {}.hover();", target),
            None,
        ),
        Action::Keypress { key } => (
            StepKind::Keypress,
            format!("Press {}", key),
            format!("await page.keyboard.press({});", js_string(key)),
            Some(json!({ "key": key })),
        ),
        Action::Submit => (
            StepKind::Submit,
            format!("Submit {}", target_name(record)),
            format!(
                "await {}.evaluate((form) => (form as HTMLFormElement).requestSubmit());",
                target
            ),
            None,
        ),
        Action::ApiCall { url, method } => (
            StepKind::ApiCall,
            format!("API call: {} {}", method, url),
            format!("// {} {}", method, url),
            Some(json!({ "url": url, "method": method })),
        ),
        Action::Wait {
            strategy,
            timeout_ms,
            target: wait_target,
        } => {
            let (description, code) = wait_code(*strategy, *timeout_ms, wait_target.as_deref());
            (
                StepKind::Wait,
                description,
                code,
                Some(json!({ "strategy": strategy.as_str(), "timeout_ms": timeout_ms })),
            )
        }
    }
}

fn wait_code(strategy: WaitStrategy, timeout_ms: u64, target: Option<&str>) -> (String, String) {
    match (strategy, target) {
        (WaitStrategy::NetworkIdle, _) => (
            "Wait for network idle".to_string(),
            format!(
                "await page.waitForLoadState('networkidle', {{ timeout: {} }});",
                timeout_ms
            ),
        ),
        (WaitStrategy::Navigation, _) => (
            "Wait for navigation".to_string(),
            format!(
                "await page.waitForLoadState('load', {{ timeout: {} }});",
                timeout_ms
            ),
        ),
        (WaitStrategy::Visible, Some(selector)) => (
            format!("Wait for {} to be visible", selector),
            format!(
                "await {}.waitFor({{ state: 'visible', timeout: {} }});",
                locator_expression("page", selector, engine_kind(selector)),
                timeout_ms
            ),
        ),
        (WaitStrategy::Response, Some(url)) => (
            format!("Wait for response from {}", url),
            format!(
                "await page.waitForResponse((response) => response.url().includes({}), {{ timeout: {} }});",
                js_string(url),
                timeout_ms
            ),
        ),
        (other, None) => (
            format!("Wait ({})", other.as_str()),
            format!("await page.waitForTimeout({});", timeout_ms),
        ),
    }
}

fn value_assertion(record: &ActionRecord) -> Option<Assertion> {
    match (&record.action, record.primary_selector()) {
        (Action::Input { value }, Some(selector)) => Some(Assertion::Value {
            selector: selector.to_string(),
            value: value.clone(),
        }),
        _ => None,
    }
}

fn action_step(index: usize, record: &ActionRecord) -> TestStep {
    let (kind, description, code, data) = render(record);
    TestStep {
        index,
        kind,
        description,
        code,
        data,
        assertions: value_assertion(record).into_iter().collect(),
        sub_steps: Vec::new(),
    }
}

fn form_step(index: usize, form: &FormSequence) -> TestStep {
    let mut code = Vec::new();
    let mut sub_steps = Vec::new();
    let mut fields = Map::new();
    let mut assertions = Vec::new();

    for record in &form.actions {
        let (_, description, line, _) = render(record);
        code.push(line);
        sub_steps.push(description);
        match &record.action {
            Action::Input { value } | Action::Select { value } => {
                fields.insert(field_name(record), Value::String(value.clone()));
            }
            _ => {}
        }
        assertions.extend(value_assertion(record));
    }

    TestStep {
        index,
        kind: StepKind::FormSequence,
        description: form.description.clone(),
        code: code.join("\n"),
        data: Some(json!({ "fields": fields })),
        assertions,
        sub_steps,
    }
}
