use std::collections::HashSet;

use crate::browser::{ElementHandle, PageDriver};
use crate::config::SelectorOptions;
use crate::error::SelectorError;
use crate::models::{ElementDescriptor, SelectorKind, SelectorResult};

use super::strategies::{self, Candidate, FALLBACK_STRATEGIES};

const COMPOSITE_CONFIDENCE: f64 = 0.2;
const POSITIONAL_CONFIDENCE: f64 = 0.1;

/// Turns a live element into a ranked, validated locator.
///
/// Candidates are tried in strategy order and the first one that resolves to
/// exactly the original element wins. Evaluation errors never escape: they
/// degrade to a positional XPath.
#[derive(Debug, Clone, Default)]
pub struct SelectorGenerator {
    options: SelectorOptions,
}

enum Verdict {
    Unique,
    Rejected(String),
}

impl SelectorGenerator {
    pub fn new(options: SelectorOptions) -> Self {
        Self { options }
    }

    pub async fn generate(&self, page: &dyn PageDriver, element: ElementHandle) -> SelectorResult {
        self.generate_with_snapshot(page, element, None).await.0
    }

    /// Like [`generate`](Self::generate), also returning the descriptor the
    /// selector was built from. `snapshot` is used if the live element can no
    /// longer be described.
    pub async fn generate_with_snapshot(
        &self,
        page: &dyn PageDriver,
        element: ElementHandle,
        snapshot: Option<&ElementDescriptor>,
    ) -> (SelectorResult, Option<ElementDescriptor>) {
        let descriptor = match page.describe(element).await {
            Ok(d) => d,
            Err(e) => {
                let err = SelectorError::Describe(e.to_string());
                tracing::warn!("{} ({}), using positional XPath", err, element);
                let selector = strategies::positional_xpath(snapshot);
                return (
                    SelectorResult::unvalidated(selector, SelectorKind::Xpath, POSITIONAL_CONFIDENCE),
                    snapshot.cloned(),
                );
            }
        };

        let result = self.select(page, element, &descriptor).await;
        tracing::debug!("Selector for <{}>: {}", descriptor.tag_name, result);
        (result, Some(descriptor))
    }

    async fn select(
        &self,
        page: &dyn PageDriver,
        element: ElementHandle,
        descriptor: &ElementDescriptor,
    ) -> SelectorResult {
        let mut tried: HashSet<String> = HashSet::new();
        let mut primary: Option<Candidate> = None;

        for candidate in strategies::ordered_candidates(descriptor, &self.options) {
            tried.insert(candidate.selector.clone());
            match self.check(page, element, &candidate.selector).await {
                Verdict::Unique => {
                    primary = Some(candidate);
                    break;
                }
                Verdict::Rejected(reason) => {
                    tracing::debug!(
                        "Rejected {} candidate '{}': {}",
                        candidate.kind,
                        candidate.selector,
                        reason
                    );
                }
            }
        }

        let Some(primary) = primary else {
            let selector = strategies::composite(descriptor);
            tracing::warn!(
                "No unique selector for <{}>, using unvalidated composite '{}'",
                descriptor.tag_name,
                selector
            );
            return SelectorResult::unvalidated(selector, SelectorKind::Composite, COMPOSITE_CONFIDENCE);
        };

        let fallbacks = self.fallbacks(page, element, descriptor, &primary, &tried).await;
        SelectorResult::validated(primary.selector, primary.kind, primary.confidence)
            .with_fallbacks(fallbacks)
    }

    /// Up to two further validated selectors from the xpath, css and text
    /// strategies. Candidates rejected during the primary search are skipped.
    async fn fallbacks(
        &self,
        page: &dyn PageDriver,
        element: ElementHandle,
        descriptor: &ElementDescriptor,
        primary: &Candidate,
        tried: &HashSet<String>,
    ) -> Vec<SelectorResult> {
        let mut out: Vec<SelectorResult> = Vec::new();

        for (_, build) in FALLBACK_STRATEGIES {
            for candidate in build(descriptor, &self.options) {
                if out.len() >= SelectorResult::MAX_FALLBACKS {
                    return out;
                }
                if candidate.selector == primary.selector
                    || out.iter().any(|f| f.selector == candidate.selector)
                {
                    continue;
                }
                // Anything tried before the primary was accepted failed validation
                if tried.contains(&candidate.selector) {
                    continue;
                }
                if let Verdict::Unique = self.check(page, element, &candidate.selector).await {
                    out.push(SelectorResult::validated(
                        candidate.selector,
                        candidate.kind,
                        candidate.confidence,
                    ));
                    break;
                }
            }
        }

        out
    }

    /// Validation protocol: exactly one match, and it is the original element
    async fn check(&self, page: &dyn PageDriver, element: ElementHandle, selector: &str) -> Verdict {
        match page.resolve(selector).await {
            Ok(matches) => match matches.as_slice() {
                [only] if *only == element => Verdict::Unique,
                [] => Verdict::Rejected("no match".to_string()),
                [_] => Verdict::Rejected("matches a different element".to_string()),
                many => Verdict::Rejected(format!("{} matches", many.len())),
            },
            Err(e) => {
                let err = SelectorError::Resolve {
                    selector: selector.to_string(),
                    message: e.to_string(),
                };
                Verdict::Rejected(err.to_string())
            }
        }
    }
}
