pub mod optimizer;
pub mod steps;

use crate::config::ParserOptions;
use crate::models::{ActionRecord, TestStep};

pub use optimizer::{FormSequence, Unit};

/// Turns a recorded action log into test steps.
///
/// Pure: works only on already captured data, so the same input always
/// yields the same steps.
#[derive(Debug, Clone, Default)]
pub struct ActionParser {
    options: ParserOptions,
}

impl ActionParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Optimized units, before conversion to steps
    pub fn optimize(&self, records: &[ActionRecord]) -> Vec<Unit> {
        optimizer::optimize(records, &self.options)
    }

    pub fn parse(&self, records: &[ActionRecord]) -> Vec<TestStep> {
        let units = self.optimize(records);
        let steps = steps::to_steps(&units);
        tracing::debug!(
            "Parsed {} actions into {} steps",
            records.len(),
            steps.len()
        );
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ElementDescriptor, SelectorKind, SelectorResult, StepKind};

    fn record(timestamp: u64, action: Action, selector: &str, element: ElementDescriptor) -> ActionRecord {
        ActionRecord::new(timestamp, "http://localhost/login", action).with_target(
            SelectorResult::validated(selector, SelectorKind::Id, 0.8),
            element,
        )
    }

    #[test]
    fn test_input_step_asserts_value() {
        let parser = ActionParser::default();
        let steps = parser.parse(&[record(
            0,
            Action::Input {
                value: "alice".to_string(),
            },
            "#user",
            ElementDescriptor::new("input").with_id("user"),
        )]);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, StepKind::Input);
        assert_eq!(steps[0].code, "await page.locator('#user').fill('alice');");
        assert_eq!(steps[0].description, "Enter \"alice\" into user");
        assert_eq!(steps[0].assertions.len(), 1);
    }

    #[test]
    fn test_navigation_step_folds_idle_wait() {
        let parser = ActionParser::default();
        let steps = parser.parse(&[ActionRecord::navigation(0, "http://localhost/")]);
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].code_lines(),
            vec![
                "await page.goto('http://localhost/');",
                "await page.waitForLoadState('networkidle', { timeout: 5000 });",
            ]
        );
    }
}
