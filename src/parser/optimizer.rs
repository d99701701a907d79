//! Normalization passes over the recorded action log: redundancy
//! elimination, form grouping, wait insertion, form reordering and
//! navigation look-ahead.

use crate::config::ParserOptions;
use crate::models::{Action, ActionKind, ActionRecord, WaitStrategy};

const NAVIGATION_IDLE_TIMEOUT_MS: u64 = 5_000;
const CLICK_NAVIGATION_TIMEOUT_MS: u64 = 10_000;
const SUBMIT_IDLE_TIMEOUT_MS: u64 = 10_000;
const RESPONSE_TIMEOUT_MS: u64 = 5_000;

/// Contiguous form actions folded into one step
#[derive(Debug, Clone, PartialEq)]
pub struct FormSequence {
    pub actions: Vec<ActionRecord>,
    pub description: String,
}

impl FormSequence {
    fn new(actions: Vec<ActionRecord>) -> Self {
        let fields = actions
            .iter()
            .filter(|a| matches!(a.kind(), ActionKind::Input | ActionKind::Select))
            .count();
        let submits = actions
            .iter()
            .any(|a| a.kind() == ActionKind::Click && a.targets_submit_control());
        let noun = if fields == 1 { "field" } else { "fields" };
        let description = if submits {
            format!("Fill form with {} {}, and submit", fields, noun)
        } else {
            format!("Fill form with {} {}", fields, noun)
        };
        Self {
            actions,
            description,
        }
    }

    pub fn first(&self) -> Option<&ActionRecord> {
        self.actions.first()
    }

    pub fn last(&self) -> Option<&ActionRecord> {
        self.actions.last()
    }
}

/// One unit of the optimized log
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Action {
        record: ActionRecord,
        /// Selectors the page is expected to show, set on navigations only
        expected: Vec<String>,
    },
    Form(FormSequence),
}

impl Unit {
    fn single(record: ActionRecord) -> Self {
        Unit::Action {
            record,
            expected: Vec::new(),
        }
    }

    /// The record that ends this unit
    pub fn last_record(&self) -> Option<&ActionRecord> {
        match self {
            Unit::Action { record, .. } => Some(record),
            Unit::Form(form) => form.last(),
        }
    }

    /// The record that starts this unit
    pub fn first_record(&self) -> Option<&ActionRecord> {
        match self {
            Unit::Action { record, .. } => Some(record),
            Unit::Form(form) => form.first(),
        }
    }

    pub fn records(&self) -> Vec<&ActionRecord> {
        match self {
            Unit::Action { record, .. } => vec![record],
            Unit::Form(form) => form.actions.iter().collect(),
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Unit::Action { record, .. } if record.is_synthetic_wait())
    }
}

/// Run every pass in order
pub fn optimize(records: &[ActionRecord], options: &ParserOptions) -> Vec<Unit> {
    let deduped = eliminate_redundant(records);
    let grouped = group_sequences(deduped);
    let waited = insert_waits(grouped, options);
    let reordered = reorder_forms(waited);
    annotate_navigations(reordered, options.lookahead)
}

fn is_redundant_pair(earlier: &ActionRecord, later: &ActionRecord) -> bool {
    let same_target = match (earlier.primary_selector(), later.primary_selector()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    same_target
        && matches!(
            (earlier.kind(), later.kind()),
            (ActionKind::Click, ActionKind::Click)
                | (ActionKind::Input, ActionKind::Input)
                | (ActionKind::Hover, ActionKind::Click)
        )
}

/// Drop the earlier action of each consecutive redundant pair. Applied until
/// no pair remains, so a run of clicks on one element keeps only the last.
pub fn eliminate_redundant(records: &[ActionRecord]) -> Vec<ActionRecord> {
    let mut out: Vec<ActionRecord> = Vec::with_capacity(records.len());
    for record in records {
        while out.last().is_some_and(|prev| is_redundant_pair(prev, record)) {
            out.pop();
        }
        out.push(record.clone());
    }
    out
}

fn is_groupable(record: &ActionRecord) -> bool {
    matches!(
        record.kind(),
        ActionKind::Input | ActionKind::Select | ActionKind::Click
    ) && record
        .element
        .as_ref()
        .map(|e| e.is_form_element())
        .unwrap_or(false)
}

fn flush(group: &mut Vec<ActionRecord>, out: &mut Vec<Unit>) {
    if group.is_empty() {
        return;
    }
    let actions = std::mem::take(group);
    let has_field = actions
        .iter()
        .any(|a| matches!(a.kind(), ActionKind::Input | ActionKind::Select));
    if actions.len() >= 2 && has_field {
        out.push(Unit::Form(FormSequence::new(actions)));
    } else {
        out.extend(actions.into_iter().map(Unit::single));
    }
}

/// Fold contiguous form-element actions into form sequences. A submit click
/// closes its group; any other action flushes the open group.
pub fn group_sequences(records: Vec<ActionRecord>) -> Vec<Unit> {
    let mut out = Vec::new();
    let mut group: Vec<ActionRecord> = Vec::new();

    for record in records {
        if is_groupable(&record) {
            let closes = record.kind() == ActionKind::Click && record.targets_submit_control();
            group.push(record);
            if closes {
                flush(&mut group, &mut out);
            }
        } else {
            flush(&mut group, &mut out);
            out.push(Unit::single(record));
        }
    }
    flush(&mut group, &mut out);
    out
}

/// The synthetic wait to place between `current` and `next`, if any
fn wait_after(
    current: &ActionRecord,
    next: Option<&ActionRecord>,
    options: &ParserOptions,
) -> Option<ActionRecord> {
    let wait = |strategy, timeout_ms, target| {
        Some(ActionRecord::wait(
            current.timestamp,
            &current.page_url,
            strategy,
            timeout_ms,
            target,
        ))
    };

    match &current.action {
        Action::Navigation { .. } => {
            wait(WaitStrategy::NetworkIdle, NAVIGATION_IDLE_TIMEOUT_MS, None)
        }
        Action::Click => {
            if next.is_some_and(|n| n.kind() == ActionKind::Navigation) {
                return wait(WaitStrategy::Navigation, CLICK_NAVIGATION_TIMEOUT_MS, None);
            }
            if current.targets_submit_control() {
                return wait(WaitStrategy::NetworkIdle, SUBMIT_IDLE_TIMEOUT_MS, None);
            }
            let next = next?;
            let selector = next.primary_selector()?;
            let delta = next.timestamp.saturating_sub(current.timestamp);
            if delta > options.min_wait_delay_ms {
                let timeout = delta.saturating_mul(2).min(options.max_wait_timeout_ms);
                return wait(WaitStrategy::Visible, timeout, Some(selector.to_string()));
            }
            None
        }
        Action::ApiCall { url, .. } => {
            wait(WaitStrategy::Response, RESPONSE_TIMEOUT_MS, Some(url.clone()))
        }
        _ => None,
    }
}

/// Insert at most one synthetic wait after each unit. A boundary that
/// already carries a wait is left alone.
pub fn insert_waits(units: Vec<Unit>, options: &ParserOptions) -> Vec<Unit> {
    let mut out = Vec::with_capacity(units.len() * 2);
    let mut iter = units.into_iter().peekable();

    while let Some(unit) = iter.next() {
        let wait = match (unit.last_record(), iter.peek()) {
            (_, Some(next)) if next.is_wait() => None,
            (Some(_), _) if unit.is_wait() => None,
            (Some(current), next) => {
                wait_after(current, next.and_then(|n| n.first_record()), options)
            }
            (None, _) => None,
        };
        out.push(unit);
        if let Some(wait) = wait {
            out.push(Unit::single(wait));
        }
    }
    out
}

fn form_precedence(record: &ActionRecord) -> u8 {
    if record.kind() == ActionKind::Click {
        return 3;
    }
    if record.kind() == ActionKind::Select {
        return 1;
    }
    match record.tag_name() {
        Some("select") => 1,
        Some("textarea") => 2,
        _ => 0,
    }
}

/// Sort each form's actions input < select < textarea < click, stable
pub fn reorder_forms(units: Vec<Unit>) -> Vec<Unit> {
    units
        .into_iter()
        .map(|unit| match unit {
            Unit::Form(mut form) => {
                form.actions.sort_by_key(form_precedence);
                Unit::Form(form)
            }
            other => other,
        })
        .collect()
}

/// Give each navigation the selectors of the next `lookahead` targeted
/// actions before the following navigation
pub fn annotate_navigations(units: Vec<Unit>, lookahead: usize) -> Vec<Unit> {
    let upcoming: Vec<Vec<String>> = (0..units.len())
        .map(|i| {
            let mut selectors: Vec<String> = Vec::new();
            'scan: for unit in &units[i + 1..] {
                for record in unit.records() {
                    if record.kind() == ActionKind::Navigation {
                        break 'scan;
                    }
                    if record.is_synthetic_wait() {
                        continue;
                    }
                    if let Some(selector) = record.primary_selector() {
                        if !selectors.iter().any(|s| s == selector) {
                            selectors.push(selector.to_string());
                        }
                    }
                    if selectors.len() >= lookahead {
                        break 'scan;
                    }
                }
            }
            selectors
        })
        .collect();

    units
        .into_iter()
        .zip(upcoming)
        .map(|(unit, selectors)| match unit {
            Unit::Action { record, .. } if record.kind() == ActionKind::Navigation => {
                Unit::Action {
                    record,
                    expected: selectors,
                }
            }
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ElementDescriptor, SelectorKind, SelectorResult};

    fn targeted(timestamp: u64, action: Action, selector: &str, element: ElementDescriptor) -> ActionRecord {
        ActionRecord::new(timestamp, "http://localhost/form", action).with_target(
            SelectorResult::validated(selector, SelectorKind::Id, 0.8),
            element,
        )
    }

    fn click(timestamp: u64, selector: &str, tag: &str) -> ActionRecord {
        targeted(
            timestamp,
            Action::Click,
            selector,
            ElementDescriptor::new(tag).with_attribute("type", "button"),
        )
    }

    fn input(timestamp: u64, selector: &str, value: &str) -> ActionRecord {
        targeted(
            timestamp,
            Action::Input {
                value: value.to_string(),
            },
            selector,
            ElementDescriptor::new("input"),
        )
    }

    #[test]
    fn test_redundant_inputs_keep_last_value() {
        let out = eliminate_redundant(&[input(0, "#q", "a"), input(10, "#q", "ab"), input(20, "#q", "abc")]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].action,
            Action::Input {
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_hover_then_click_collapses() {
        let hover = targeted(0, Action::Hover, "#menu", ElementDescriptor::new("a"));
        let out = eliminate_redundant(&[hover, click(50, "#menu", "a")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), ActionKind::Click);
    }

    #[test]
    fn test_different_targets_survive() {
        let out = eliminate_redundant(&[click(0, "#a", "a"), click(10, "#b", "a")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_single_click_is_not_a_form() {
        let units = group_sequences(vec![click(0, "#btn", "button")]);
        assert!(matches!(units[0], Unit::Action { .. }));
    }

    #[test]
    fn test_navigation_flushes_group() {
        let units = group_sequences(vec![
            input(0, "#a", "1"),
            input(10, "#b", "2"),
            ActionRecord::navigation(20, "http://localhost/next"),
            input(30, "#c", "3"),
        ]);
        assert_eq!(units.len(), 3);
        assert!(matches!(units[0], Unit::Form(_)));
        assert!(matches!(units[2], Unit::Action { .. }));
    }

    #[test]
    fn test_form_description() {
        let units = group_sequences(vec![input(0, "#a", "1"), input(10, "#b", "2")]);
        match &units[0] {
            Unit::Form(form) => assert_eq!(form.description, "Fill form with 2 fields"),
            other => panic!("expected form, got {:?}", other),
        }
    }

    #[test]
    fn test_visible_wait_is_capped() {
        let options = ParserOptions::default();
        let units = insert_waits(
            vec![
                Unit::single(click(0, "#open", "a")),
                Unit::single(click(4000, "#item", "a")),
            ],
            &options,
        );
        assert_eq!(units.len(), 3);
        match &units[1] {
            Unit::Action { record, .. } => assert_eq!(
                record.action,
                Action::Wait {
                    strategy: WaitStrategy::Visible,
                    timeout_ms: 5000,
                    target: Some("#item".to_string()),
                }
            ),
            other => panic!("expected wait, got {:?}", other),
        }
    }

    #[test]
    fn test_huge_gap_saturates_to_cap() {
        let options = ParserOptions::default();
        let units = insert_waits(
            vec![
                Unit::single(click(0, "#open", "a")),
                Unit::single(click(u64::MAX, "#item", "a")),
            ],
            &options,
        );
        match &units[1] {
            Unit::Action { record, .. } => assert_eq!(
                record.action,
                Action::Wait {
                    strategy: WaitStrategy::Visible,
                    timeout_ms: options.max_wait_timeout_ms,
                    target: Some("#item".to_string()),
                }
            ),
            other => panic!("expected wait, got {:?}", other),
        }
    }

    #[test]
    fn test_quick_follow_up_gets_no_wait() {
        let options = ParserOptions::default();
        let units = insert_waits(
            vec![
                Unit::single(click(0, "#open", "a")),
                Unit::single(click(50, "#item", "a")),
            ],
            &options,
        );
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_click_before_navigation_waits_for_navigation() {
        let options = ParserOptions::default();
        let units = insert_waits(
            vec![
                Unit::single(click(0, "#link", "a")),
                Unit::single(ActionRecord::navigation(30, "http://localhost/next")),
            ],
            &options,
        );
        match &units[1] {
            Unit::Action { record, .. } => assert!(matches!(
                record.action,
                Action::Wait {
                    strategy: WaitStrategy::Navigation,
                    timeout_ms: 10_000,
                    ..
                }
            )),
            other => panic!("expected wait, got {:?}", other),
        }
    }

    #[test]
    fn test_api_call_waits_for_response() {
        let options = ParserOptions::default();
        let call = ActionRecord::new(
            0,
            "http://localhost/",
            Action::ApiCall {
                url: "http://localhost/api/users".to_string(),
                method: "GET".to_string(),
            },
        );
        let units = insert_waits(vec![Unit::single(call)], &options);
        match &units[1] {
            Unit::Action { record, .. } => assert_eq!(
                record.action,
                Action::Wait {
                    strategy: WaitStrategy::Response,
                    timeout_ms: 5000,
                    target: Some("http://localhost/api/users".to_string()),
                }
            ),
            other => panic!("expected wait, got {:?}", other),
        }
    }

    #[test]
    fn test_form_reordered_by_element_kind() {
        let select = targeted(
            5,
            Action::Select {
                value: "NL".to_string(),
            },
            "#country",
            ElementDescriptor::new("select"),
        );
        let submit = targeted(0, Action::Click, "#go", ElementDescriptor::new("button"));
        let form = FormSequence::new(vec![submit, select, input(10, "#name", "Ann")]);
        let units = reorder_forms(vec![Unit::Form(form)]);
        let Unit::Form(form) = &units[0] else {
            panic!("expected form");
        };
        let order: Vec<_> = form.actions.iter().filter_map(|a| a.primary_selector()).collect();
        assert_eq!(order, vec!["#name", "#country", "#go"]);
    }

    #[test]
    fn test_navigation_lookahead_is_bounded() {
        let units = vec![
            Unit::single(ActionRecord::navigation(0, "http://localhost/")),
            Unit::single(click(10, "#a", "a")),
            Unit::single(click(20, "#b", "a")),
            Unit::single(click(30, "#c", "a")),
            Unit::single(click(40, "#d", "a")),
        ];
        let units = annotate_navigations(units, 3);
        match &units[0] {
            Unit::Action { expected, .. } => assert_eq!(expected, &vec!["#a", "#b", "#c"]),
            other => panic!("expected navigation, got {:?}", other),
        }
    }
}
