use serde::{Deserialize, Serialize};

/// A generated check attached to a test step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// The page URL matches the given pattern
    Url { pattern: String },
    /// The element is visible
    Visible { selector: String },
    /// The element holds the given value
    Value { selector: String, value: String },
}

/// Kind of test step, mirrors the action it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Navigate,
    Click,
    Input,
    Select,
    Hover,
    Keypress,
    Submit,
    ApiCall,
    Wait,
    FormSequence,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Navigate => "navigate",
            StepKind::Click => "click",
            StepKind::Input => "input",
            StepKind::Select => "select",
            StepKind::Hover => "hover",
            StepKind::Keypress => "keypress",
            StepKind::Submit => "submit",
            StepKind::ApiCall => "api_call",
            StepKind::Wait => "wait",
            StepKind::FormSequence => "form_sequence",
        }
    }
}

/// One replayable, assertion-bearing unit derived from one or more action
/// records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub index: usize,
    pub kind: StepKind,
    pub description: String,
    /// Replay code, one statement per line
    pub code: String,
    /// Literal values that can be turned into test parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<Assertion>,
    /// Sub-step descriptions of a form sequence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_steps: Vec<String>,
}

impl TestStep {
    pub fn code_lines(&self) -> Vec<&str> {
        self.code.lines().collect()
    }
}
