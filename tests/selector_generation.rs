//! Selector generation against a scripted page.
//!
//! Run with: cargo test --test selector_generation

mod common;

use common::MockPage;
use playscribe::browser::ElementHandle;
use playscribe::config::SelectorOptions;
use playscribe::models::{ElementDescriptor, LabelContext, LabelSource, SelectorKind};
use playscribe::selector::SelectorGenerator;

fn generator() -> SelectorGenerator {
    SelectorGenerator::new(SelectorOptions::default())
}

fn save_button() -> ElementDescriptor {
    let mut element = ElementDescriptor::new("button");
    element
        .attributes
        .insert("data-testid".to_string(), "save-btn".to_string());
    element.class_list = vec!["css-a1b2c3d4".to_string()];
    element.text_content = "Save".to_string();
    element
}

// ============================================================================
// Ranking
// ============================================================================

#[tokio::test]
async fn test_data_testid_wins_and_generated_class_is_dropped() {
    let page = MockPage::new("https://app.test/editor")
        .element(7, save_button())
        .matches(r#"[data-testid="save-btn"]"#, &[7])
        .matches("button", &[7])
        .matches(r#"button:has-text("Save")"#, &[7])
        .matches("button.css-a1b2c3d4", &[7]);

    let result = generator().generate(&page, ElementHandle(7)).await;

    assert_eq!(result.selector, r#"[data-testid="save-btn"]"#);
    assert_eq!(result.kind, SelectorKind::DataAttribute);
    assert_eq!(result.confidence, 0.9);
    assert!(result.validated);
    assert!(!result.fallbacks.is_empty(), "expected validated fallbacks");
    assert!(result.fallbacks.len() <= 2);
    for fallback in &result.fallbacks {
        assert!(fallback.validated);
        assert!(
            !fallback.selector.contains("css-a1b2c3d4"),
            "generated class leaked into {}",
            fallback.selector
        );
    }
}

#[tokio::test]
async fn test_data_testid_beats_stable_id() {
    let mut element = save_button();
    element.id = "save".to_string();
    let page = MockPage::new("https://app.test/editor")
        .element(7, element)
        .matches(r#"[data-testid="save-btn"]"#, &[7])
        .matches("#save", &[7]);

    let result = generator().generate(&page, ElementHandle(7)).await;
    assert_eq!(result.kind, SelectorKind::DataAttribute);
}

#[tokio::test]
async fn test_hex_id_is_never_used() {
    let mut element = ElementDescriptor::new("button");
    element.id = "a1b2c3d4e5f6".to_string();
    element.text_content = "Save".to_string();
    let page = MockPage::new("https://app.test/editor")
        .element(3, element)
        .matches("#a1b2c3d4e5f6", &[3])
        .matches(r#"button:has-text("Save")"#, &[3]);

    let result = generator().generate(&page, ElementHandle(3)).await;

    assert_eq!(result.selector, r#"button:has-text("Save")"#);
    assert_eq!(result.kind, SelectorKind::Text);
    assert!(result
        .fallbacks
        .iter()
        .all(|f| f.selector != "#a1b2c3d4e5f6"));
}

#[tokio::test]
async fn test_label_association_for_form_field() {
    let mut element = ElementDescriptor::new("input");
    element.label = Some(LabelContext {
        text: "Email".to_string(),
        source: LabelSource::ForAttribute,
    });
    let page = MockPage::new("https://app.test/signup")
        .element(4, element)
        .matches(r#"internal:label="Email""#, &[4]);

    let result = generator().generate(&page, ElementHandle(4)).await;
    assert_eq!(result.kind, SelectorKind::LabelAssociation);
    assert_eq!(result.confidence, 0.85);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_ambiguous_and_wrong_matches_are_rejected() {
    let mut element = ElementDescriptor::new("button");
    element
        .attributes
        .insert("data-testid".to_string(), "row-action".to_string());
    element.id = "delete".to_string();
    let page = MockPage::new("https://app.test/users")
        .element(5, element)
        // Two matches: not unique
        .matches(r#"[data-testid="row-action"]"#, &[5, 6])
        // One match, but the wrong element
        .matches("#delete", &[6])
        .matches("button", &[5]);

    let result = generator().generate(&page, ElementHandle(5)).await;
    assert_eq!(result.selector, "button");
    assert_eq!(result.kind, SelectorKind::Css);
    assert!(result.validated);
}

#[tokio::test]
async fn test_evaluation_error_rejects_only_that_candidate() {
    let page = MockPage::new("https://app.test/editor")
        .element(7, save_button())
        .broken(r#"[data-testid="save-btn"]"#)
        .matches(r#"button:has-text("Save")"#, &[7]);

    let result = generator().generate(&page, ElementHandle(7)).await;
    assert_eq!(result.selector, r#"button:has-text("Save")"#);
}

#[tokio::test]
async fn test_nothing_unique_falls_back_to_unvalidated_composite() {
    let mut element = ElementDescriptor::new("input");
    element
        .attributes
        .insert("type".to_string(), "checkbox".to_string());
    element.name = "agree".to_string();
    element.sibling_index = 1;
    let page = MockPage::new("https://app.test/terms").element(9, element);

    let result = generator().generate(&page, ElementHandle(9)).await;

    assert_eq!(result.kind, SelectorKind::Composite);
    assert_eq!(result.confidence, 0.2);
    assert!(!result.validated);
    assert!(result.fallbacks.is_empty());
    assert!(result.selector.starts_with("input"));
    assert!(result.selector.contains("nth-of-type(2)"));
}

#[tokio::test]
async fn test_detached_element_gets_positional_xpath() {
    let mut snapshot = ElementDescriptor::new("button");
    snapshot.absolute_xpath = "/html/body/div[2]/button[1]".to_string();
    let page = MockPage::new("https://app.test/editor");

    let (result, descriptor) = generator()
        .generate_with_snapshot(&page, ElementHandle(42), Some(&snapshot))
        .await;

    assert_eq!(result.kind, SelectorKind::Xpath);
    assert_eq!(result.confidence, 0.1);
    assert!(!result.validated);
    assert!(result.selector.contains("/html/body/div[2]/button[1]"));
    assert_eq!(descriptor, Some(snapshot));
}

#[tokio::test]
async fn test_same_index_in_a_later_document_is_not_the_element() {
    let clicked = ElementHandle::scoped(1, 5);
    let reloaded = ElementHandle::scoped(2, 5);
    let mut link = ElementDescriptor::new("a");
    link.text_content = "Pricing".to_string();
    link.attributes
        .insert("href".to_string(), "/pricing".to_string());

    let page = MockPage::new("https://app.test/pricing")
        .element(clicked.0, link)
        .matches("a", &[reloaded.0])
        .matches(r#"a:has-text("Pricing")"#, &[reloaded.0])
        .matches(r#"text="Pricing""#, &[reloaded.0]);

    let result = generator().generate(&page, clicked).await;

    assert!(!result.validated);
    assert_eq!(result.kind, SelectorKind::Composite);
    assert!(result.fallbacks.is_empty());
}
