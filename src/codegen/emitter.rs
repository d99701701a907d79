use handlebars::Handlebars;
use serde::Serialize;

use crate::error::EmitError;
use crate::models::{PageObjectDescriptor, RecordingReport, TestStep};

use super::locator::{assertion_statement, js_string};

const TEST_TEMPLATE: &str = "test";
const PAGE_OBJECT_TEMPLATE: &str = "page_object";

const TEST_SOURCE: &str = r#"import { test, expect } from '@playwright/test';
{{#each imports}}
import { {{this.name}} } from '{{this.path}}';
{{/each}}

// Recorded from {{start_url}}
test({{title}}, async ({ page }) => {
{{#each steps}}
  // Step {{this.index}}: {{this.description}}
{{#each this.lines}}
  {{this}}
{{/each}}
{{/each}}
});
"#;

const PAGE_OBJECT_SOURCE: &str = r#"import { Page, Locator } from '@playwright/test';

export class {{name}} {
  readonly page: Page;
  readonly url = {{url}};
{{#each elements}}
  readonly {{this.name}}: Locator;
{{/each}}

  constructor(page: Page) {
    this.page = page;
{{#each elements}}
    this.{{this.name}} = {{this.locator}};
{{/each}}
  }
{{#each methods}}

  async {{this.name}}({{this.signature}}): Promise<void> {
{{#each this.body}}
    {{this}}
{{/each}}
  }
{{/each}}
}
"#;

/// Inputs to a test file besides its steps
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestMetadata {
    pub test_name: String,
    pub start_url: String,
    /// Page-object class names the test file imports
    pub imports: Vec<String>,
}

#[derive(Serialize)]
struct ImportView<'a> {
    name: &'a str,
    path: String,
}

#[derive(Serialize)]
struct StepView<'a> {
    index: usize,
    description: &'a str,
    lines: Vec<String>,
}

#[derive(Serialize)]
struct TestView<'a> {
    title: String,
    start_url: &'a str,
    imports: Vec<ImportView<'a>>,
    steps: Vec<StepView<'a>>,
}

#[derive(Serialize)]
struct ElementView<'a> {
    name: &'a str,
    locator: &'a str,
}

#[derive(Serialize)]
struct MethodView<'a> {
    name: &'a str,
    signature: String,
    body: &'a [String],
}

#[derive(Serialize)]
struct PageObjectView<'a> {
    name: &'a str,
    url: String,
    elements: Vec<ElementView<'a>>,
    methods: Vec<MethodView<'a>>,
}

/// Renders Playwright sources from steps and page objects.
///
/// Output depends only on the input, so repeated dry runs produce identical
/// text.
pub struct CodeEmitter {
    registry: Handlebars<'static>,
}

impl CodeEmitter {
    pub fn new() -> Result<Self, EmitError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);

        for (name, source) in [
            (TEST_TEMPLATE, TEST_SOURCE),
            (PAGE_OBJECT_TEMPLATE, PAGE_OBJECT_SOURCE),
        ] {
            registry
                .register_template_string(name, source)
                .map_err(|e| EmitError::Template {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { registry })
    }

    fn render<T: Serialize>(&self, name: &str, view: &T) -> Result<String, EmitError> {
        self.registry
            .render(name, view)
            .map_err(|e| EmitError::Render {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    pub fn render_test(&self, steps: &[TestStep], meta: &TestMetadata) -> Result<String, EmitError> {
        let view = TestView {
            title: js_string(&meta.test_name),
            start_url: &meta.start_url,
            imports: meta
                .imports
                .iter()
                .map(|name| ImportView {
                    name,
                    path: format!("../pages/{}", name),
                })
                .collect(),
            steps: steps
                .iter()
                .map(|step| StepView {
                    index: step.index,
                    description: &step.description,
                    lines: step
                        .code_lines()
                        .into_iter()
                        .map(|l| l.to_string())
                        .chain(step.assertions.iter().map(assertion_statement))
                        .collect(),
                })
                .collect(),
        };
        self.render(TEST_TEMPLATE, &view)
    }

    pub fn render_page_object(&self, page: &PageObjectDescriptor) -> Result<String, EmitError> {
        let view = PageObjectView {
            name: &page.name,
            url: js_string(&page.url),
            elements: page
                .elements
                .values()
                .map(|e| ElementView {
                    name: &e.name,
                    locator: &e.locator,
                })
                .collect(),
            methods: page
                .methods
                .iter()
                .map(|m| MethodView {
                    name: &m.name,
                    signature: m
                        .params
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.param_type))
                        .collect::<Vec<_>>()
                        .join(", "),
                    body: &m.body,
                })
                .collect(),
        };
        self.render(PAGE_OBJECT_TEMPLATE, &view)
    }

    pub fn render_report(&self, report: &RecordingReport) -> Result<String, EmitError> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
