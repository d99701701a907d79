use serde::{Deserialize, Serialize};
use std::fmt;

use super::element::ElementDescriptor;
use super::selector::SelectorResult;

/// How a replay should wait before the next step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitStrategy {
    #[serde(rename = "networkidle")]
    NetworkIdle,
    #[serde(rename = "navigation")]
    Navigation,
    #[serde(rename = "visible")]
    Visible,
    #[serde(rename = "response")]
    Response,
}

impl WaitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitStrategy::NetworkIdle => "networkidle",
            WaitStrategy::Navigation => "navigation",
            WaitStrategy::Visible => "visible",
            WaitStrategy::Response => "response",
        }
    }
}

/// Kind-specific payload of an action record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Navigation {
        url: String,
    },
    Click,
    Input {
        value: String,
    },
    Select {
        value: String,
    },
    Hover,
    Keypress {
        key: String,
    },
    Submit,
    ApiCall {
        url: String,
        method: String,
    },
    Wait {
        strategy: WaitStrategy,
        timeout_ms: u64,
        /// Selector for `visible`, URL for `response`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

/// Discriminant of [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Navigation,
    Click,
    Input,
    Select,
    Hover,
    Keypress,
    Submit,
    ApiCall,
    Wait,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Navigation => "navigation",
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::Select => "select",
            ActionKind::Hover => "hover",
            ActionKind::Keypress => "keypress",
            ActionKind::Submit => "submit",
            ActionKind::ApiCall => "api_call",
            ActionKind::Wait => "wait",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Navigation { .. } => ActionKind::Navigation,
            Action::Click => ActionKind::Click,
            Action::Input { .. } => ActionKind::Input,
            Action::Select { .. } => ActionKind::Select,
            Action::Hover => ActionKind::Hover,
            Action::Keypress { .. } => ActionKind::Keypress,
            Action::Submit => ActionKind::Submit,
            Action::ApiCall { .. } => ActionKind::ApiCall,
            Action::Wait { .. } => ActionKind::Wait,
        }
    }
}

/// One normalized, timestamped event captured during recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Milliseconds since recording start, non-decreasing across the log
    pub timestamp: u64,
    /// URL of the page the action happened on
    #[serde(default)]
    pub page_url: String,
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<SelectorResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementDescriptor>,
}

impl ActionRecord {
    pub fn new(timestamp: u64, page_url: impl Into<String>, action: Action) -> Self {
        Self {
            timestamp,
            page_url: page_url.into(),
            action,
            selector: None,
            element: None,
        }
    }

    pub fn navigation(timestamp: u64, url: &str) -> Self {
        Self::new(
            timestamp,
            url,
            Action::Navigation {
                url: url.to_string(),
            },
        )
    }

    pub fn wait(
        timestamp: u64,
        page_url: &str,
        strategy: WaitStrategy,
        timeout_ms: u64,
        target: Option<String>,
    ) -> Self {
        Self::new(
            timestamp,
            page_url,
            Action::Wait {
                strategy,
                timeout_ms,
                target,
            },
        )
    }

    pub fn with_target(mut self, selector: SelectorResult, element: ElementDescriptor) -> Self {
        self.selector = Some(selector);
        self.element = Some(element);
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    pub fn primary_selector(&self) -> Option<&str> {
        self.selector.as_ref().map(|s| s.selector.as_str())
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.element.as_ref().map(|e| e.tag_name.as_str())
    }

    pub fn targets_submit_control(&self) -> bool {
        self.element
            .as_ref()
            .map(|e| e.is_submit_control())
            .unwrap_or(false)
    }

    pub fn is_synthetic_wait(&self) -> bool {
        matches!(self.action, Action::Wait { .. })
    }
}

/// Type of event reported by the browser instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturedEventType {
    Navigation,
    Click,
    Input,
    Select,
    Hover,
    Keypress,
    Submit,
    Request,
}

/// Raw event as delivered by the instrumentation layer, before selector
/// generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedEvent {
    #[serde(rename = "type")]
    pub event_type: CapturedEventType,
    /// In-page handle of the target element
    #[serde(default)]
    pub handle: Option<u64>,
    /// Snapshot taken in-page at event time
    #[serde(default)]
    pub element: Option<ElementDescriptor>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    /// Wall-clock time the source observed the event, in Unix milliseconds
    #[serde(default)]
    pub epoch_ms: Option<i64>,
    /// Milliseconds since recording start, when the delivering layer knows it
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

impl CapturedEvent {
    pub fn new(event_type: CapturedEventType) -> Self {
        Self {
            event_type,
            handle: None,
            element: None,
            value: None,
            key: None,
            url: None,
            method: None,
            epoch_ms: None,
            timestamp_ms: None,
        }
    }

    /// Fill in `timestamp_ms` relative to `origin_ms`, from the source time or
    /// else from `received_ms`. An existing stamp is kept.
    pub fn stamp(&mut self, origin_ms: i64, received_ms: i64) {
        if self.timestamp_ms.is_some() {
            return;
        }
        let at = self.epoch_ms.unwrap_or(received_ms);
        self.timestamp_ms = Some(at.saturating_sub(origin_ms).max(0) as u64);
    }

    pub fn is_element_bound(&self) -> bool {
        matches!(
            self.event_type,
            CapturedEventType::Click
                | CapturedEventType::Input
                | CapturedEventType::Select
                | CapturedEventType::Hover
                | CapturedEventType::Submit
        )
    }

    /// Build the kind-specific payload; `None` for events missing required data
    pub fn to_action(&self) -> Option<Action> {
        let action = match self.event_type {
            CapturedEventType::Navigation => Action::Navigation {
                url: self.url.clone()?,
            },
            CapturedEventType::Click => Action::Click,
            CapturedEventType::Input => Action::Input {
                value: self.value.clone().unwrap_or_default(),
            },
            CapturedEventType::Select => Action::Select {
                value: self.value.clone().unwrap_or_default(),
            },
            CapturedEventType::Hover => Action::Hover,
            CapturedEventType::Keypress => Action::Keypress {
                key: self.key.clone().or_else(|| self.value.clone())?,
            },
            CapturedEventType::Submit => Action::Submit,
            CapturedEventType::Request => Action::ApiCall {
                url: self.url.clone()?,
                method: self
                    .method
                    .clone()
                    .unwrap_or_else(|| "GET".to_string())
                    .to_uppercase(),
            },
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_record_json_shape() {
        let record = ActionRecord::new(
            10,
            "https://example.com/login",
            Action::Input {
                value: "alice".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "input");
        assert_eq!(json["value"], "alice");
        assert_eq!(json["timestamp"], 10);
    }

    #[test]
    fn test_wait_strategy_names() {
        let json = serde_json::to_string(&WaitStrategy::NetworkIdle).unwrap();
        assert_eq!(json, "\"networkidle\"");
    }

    #[test]
    fn test_captured_event_requires_url_for_navigation() {
        let event = CapturedEvent::new(CapturedEventType::Navigation);
        assert!(event.to_action().is_none());
    }

    #[test]
    fn test_stamp_prefers_source_time() {
        let mut event: CapturedEvent =
            serde_json::from_str(r#"{"type":"click","handle":3,"epoch_ms":1700000001250}"#).unwrap();
        event.stamp(1_700_000_000_000, 1_700_000_004_000);
        assert_eq!(event.timestamp_ms, Some(1250));

        let mut late = CapturedEvent::new(CapturedEventType::Navigation);
        late.stamp(1_700_000_000_000, 1_700_000_004_000);
        assert_eq!(late.timestamp_ms, Some(4000));

        // Clock skew never produces a negative offset
        let mut early = CapturedEvent::new(CapturedEventType::Click);
        early.epoch_ms = Some(1_699_999_999_000);
        early.stamp(1_700_000_000_000, 1_700_000_000_000);
        assert_eq!(early.timestamp_ms, Some(0));
    }

    #[test]
    fn test_captured_request_uppercases_method() {
        let event: CapturedEvent = serde_json::from_str(
            r#"{"type":"request","url":"https://api.example.com/users","method":"post"}"#,
        )
        .unwrap();
        assert_eq!(
            event.to_action(),
            Some(Action::ApiCall {
                url: "https://api.example.com/users".to_string(),
                method: "POST".to_string()
            })
        );
    }
}
