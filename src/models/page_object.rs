use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An element exposed by a page object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBinding {
    pub name: String,
    pub selector: String,
    pub tag: String,
    pub description: String,
    /// Replay expression resolving the element, e.g. `this.page.locator('#user')`
    pub locator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageObjectMethod {
    pub name: String,
    pub params: Vec<MethodParam>,
    /// Replay statements in order
    pub body: Vec<String>,
    /// All replay operations are asynchronous
    pub is_async: bool,
    /// Number of recorded actions folded into this method
    pub action_count: usize,
}

impl PageObjectMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            body: Vec::new(),
            is_async: true,
            action_count: 0,
        }
    }

    pub fn body_text(&self) -> String {
        self.body.join("\n")
    }
}

/// Named bundle of element bindings and methods for one logical page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageObjectDescriptor {
    pub name: String,
    pub url: String,
    /// element-name -> binding
    pub elements: BTreeMap<String, ElementBinding>,
    pub methods: Vec<PageObjectMethod>,
}

impl PageObjectDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            elements: BTreeMap::new(),
            methods: Vec::new(),
        }
    }

    pub fn method(&self, name: &str) -> Option<&PageObjectMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// File name for the rendered page object, e.g. `LoginPage.ts`
    pub fn file_name(&self) -> String {
        format!("{}.ts", self.name)
    }
}
