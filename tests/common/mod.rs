//! Scripted page and launcher doubles shared by the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use playscribe::browser::{
    BrowserLauncher, BrowserSession, ElementHandle, LaunchOptions, LaunchedBrowser, PageDriver,
};
use playscribe::models::{CapturedEvent, CapturedEventType, ElementDescriptor};
use playscribe::recording::RecorderEvent;

/// Page whose DOM is a pair of lookup tables
#[derive(Default)]
pub struct MockPage {
    pub url: String,
    elements: HashMap<u64, ElementDescriptor>,
    matches: HashMap<String, Vec<u64>>,
    broken_selectors: Vec<String>,
}

impl MockPage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn element(mut self, handle: u64, descriptor: ElementDescriptor) -> Self {
        self.elements.insert(handle, descriptor);
        self
    }

    /// `selector` resolves to `handles`, in order
    pub fn matches(mut self, selector: &str, handles: &[u64]) -> Self {
        self.matches.insert(selector.to_string(), handles.to_vec());
        self
    }

    /// Resolving `selector` raises an evaluation error
    pub fn broken(mut self, selector: &str) -> Self {
        self.broken_selectors.push(selector.to_string());
        self
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn describe(&self, element: ElementHandle) -> Result<ElementDescriptor> {
        self.elements
            .get(&element.0)
            .cloned()
            .ok_or_else(|| anyhow!("{} is detached", element))
    }

    async fn resolve(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        if self.broken_selectors.iter().any(|s| s == selector) {
            return Err(anyhow!("invalid selector: {}", selector));
        }
        Ok(self
            .matches
            .get(selector)
            .map(|handles| handles.iter().copied().map(ElementHandle).collect())
            .unwrap_or_default())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}

struct MockSession {
    page: Arc<MockPage>,
    closes: Arc<AtomicUsize>,
    close_fails: bool,
}

#[async_trait]
impl BrowserSession for MockSession {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.close_fails {
            return Err(anyhow!("browser process did not exit"));
        }
        Ok(())
    }
}

/// Launcher that replays scripted events into the recorder
pub struct MockLauncher {
    page: Arc<MockPage>,
    script: Vec<CapturedEvent>,
    fail: bool,
    close_fails: bool,
    pub launches: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    /// Kept open so the event stream does not end while recording
    sender: Mutex<Option<mpsc::Sender<CapturedEvent>>>,
}

impl MockLauncher {
    pub fn new(page: MockPage, script: Vec<CapturedEvent>) -> Self {
        Self {
            page: Arc::new(page),
            script,
            fail: false,
            close_fails: false,
            launches: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            sender: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(MockPage::new("about:blank"), Vec::new())
        }
    }

    /// Sessions whose close reports an error
    pub fn with_failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<LaunchedBrowser> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("chrome not found"));
        }

        let (tx, rx) = mpsc::channel(64);
        for event in &self.script {
            tx.send(event.clone()).await?;
        }
        if let Ok(mut sender) = self.sender.lock() {
            *sender = Some(tx);
        }

        Ok(LaunchedBrowser {
            session: Box::new(MockSession {
                page: Arc::clone(&self.page),
                closes: Arc::clone(&self.closes),
                close_fails: self.close_fails,
            }),
            events: rx,
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn input(id: &str) -> ElementDescriptor {
    let mut element = ElementDescriptor::new("input");
    element.id = id.to_string();
    element.name = id.to_string();
    element
        .attributes
        .insert("type".to_string(), "text".to_string());
    element
}

pub fn submit_button(text: &str) -> ElementDescriptor {
    let mut element = ElementDescriptor::new("button");
    element.text_content = text.to_string();
    element
        .attributes
        .insert("type".to_string(), "submit".to_string());
    element
}

pub fn navigation(url: &str, timestamp: u64) -> CapturedEvent {
    CapturedEvent {
        url: Some(url.to_string()),
        timestamp_ms: Some(timestamp),
        ..CapturedEvent::new(CapturedEventType::Navigation)
    }
}

pub fn typed(handle: u64, value: &str, timestamp: u64) -> CapturedEvent {
    CapturedEvent {
        handle: Some(handle),
        value: Some(value.to_string()),
        timestamp_ms: Some(timestamp),
        ..CapturedEvent::new(CapturedEventType::Input)
    }
}

pub fn clicked(handle: u64, timestamp: u64) -> CapturedEvent {
    CapturedEvent {
        handle: Some(handle),
        timestamp_ms: Some(timestamp),
        ..CapturedEvent::new(CapturedEventType::Click)
    }
}

/// Login page with `#user`, `#pass` and a "Sign in" submit button
pub fn login_page(url: &str) -> MockPage {
    MockPage::new(url)
        .element(1, input("user"))
        .element(2, input("pass"))
        .element(3, submit_button("Sign in"))
        .matches("#user", &[1])
        .matches("#pass", &[2])
        .matches(r#"button:has-text("Sign in")"#, &[3])
}

pub fn login_script(url: &str) -> Vec<CapturedEvent> {
    vec![
        navigation(url, 0),
        typed(1, "alice", 1000),
        typed(2, "secret", 2000),
        clicked(3, 3000),
    ]
}

/// Wait until `count` action events have been broadcast
pub async fn wait_for_actions(rx: &mut broadcast::Receiver<RecorderEvent>, count: usize) {
    let mut seen = 0;
    while seen < count {
        match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
            Ok(Ok(RecorderEvent::Action { .. })) => seen += 1,
            Ok(Ok(_)) => {}
            Ok(Err(e)) => panic!("event channel failed: {}", e),
            Err(_) => panic!("timed out after {} of {} actions", seen, count),
        }
    }
}
