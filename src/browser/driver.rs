use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::models::{CapturedEvent, ElementDescriptor};

/// Opaque reference to a live DOM element.
///
/// Two handles are equal exactly when they refer to the same element. The
/// high bits carry a token drawn per document, so a handle taken before a
/// navigation never equals one registered afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub u64);

impl ElementHandle {
    /// Multiplier of the document token; must match `DOCUMENT_SCOPE` in the
    /// page runtime
    pub const DOCUMENT_SCOPE: u64 = 1 << 32;

    pub fn scoped(document: u64, index: u64) -> Self {
        Self(document * Self::DOCUMENT_SCOPE + index)
    }

    pub fn document(&self) -> u64 {
        self.0 / Self::DOCUMENT_SCOPE
    }

    pub fn index(&self) -> u64 {
        self.0 % Self::DOCUMENT_SCOPE
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}.{}", self.document(), self.index())
    }
}

/// Live page access needed by selector generation
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Snapshot an element's observable attributes
    async fn describe(&self, element: ElementHandle) -> Result<ElementDescriptor>;

    /// Resolve a selector to every element it matches, in document order
    async fn resolve(&self, selector: &str) -> Result<Vec<ElementHandle>>;

    /// Run a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub url: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

/// A launched browser with its recording page
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn page(&self) -> Arc<dyn PageDriver>;

    /// Release the page, context and browser process
    async fn close(&self) -> Result<()>;
}

/// Result of a successful launch: the session plus the ordered event feed
pub struct LaunchedBrowser {
    pub session: Box<dyn BrowserSession>,
    pub events: mpsc::Receiver<CapturedEvent>,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser, open the start URL and install event capture.
    ///
    /// Implementations release anything they acquired before returning an
    /// error.
    async fn launch(&self, options: &LaunchOptions) -> Result<LaunchedBrowser>;
}
