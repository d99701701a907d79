use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventRequestWillBeSent, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, EventFrameNavigated,
};
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use chrono::Utc;
use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::driver::{
    BrowserLauncher, BrowserSession, ElementHandle, LaunchOptions, LaunchedBrowser, PageDriver,
};
use super::scripts::{describe_expression, resolve_expression, CAPTURE_BINDING, PAGE_RUNTIME};
use crate::models::{CapturedEvent, CapturedEventType, ElementDescriptor};

const EVENT_BUFFER: usize = 1024;

/// Launches Chrome over CDP and wires the page runtime into it
#[derive(Debug, Default, Clone)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<LaunchedBrowser> {
        let mut config = BrowserConfig::builder()
            .window_size(options.viewport_width, options.viewport_height);

        if !options.headless {
            config = config.with_head();
        }

        config = config
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-default-apps")
            .arg("--disable-extensions");

        let config = config
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {}", e))?;

        let (mut browser, mut handler) = timeout(Duration::from_secs(30), Browser::launch(config))
            .await
            .map_err(|_| anyhow!("Browser launch timeout (30s) - Chrome may not be installed or is unresponsive"))?
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!("Browser event: {:?}", event);
            }
        });

        match install_capture(&browser, options).await {
            Ok((page, events, forwarder)) => {
                tracing::info!("Browser launched and navigated to {}", options.url);
                Ok(LaunchedBrowser {
                    session: Box::new(ChromiumSession {
                        browser: Mutex::new(Some(browser)),
                        page: Arc::new(ChromiumPage { page }),
                        tasks: Mutex::new(vec![forwarder, handler_task]),
                    }),
                    events,
                })
            }
            Err(e) => {
                tracing::warn!("Browser setup failed, closing: {}", e);
                let _ = browser.close().await;
                handler_task.abort();
                Err(e)
            }
        }
    }
}

/// Open the recording page with the binding, runtime and listeners in place
/// before the first navigation, so the start URL is captured too.
async fn install_capture(
    browser: &Browser,
    options: &LaunchOptions,
) -> Result<(Page, mpsc::Receiver<CapturedEvent>, JoinHandle<()>)> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| anyhow!("Failed to create page: {}", e))?;

    let emulation_params = SetDeviceMetricsOverrideParams::builder()
        .width(options.viewport_width as i64)
        .height(options.viewport_height as i64)
        .device_scale_factor(1.0)
        .mobile(false)
        .build()
        .map_err(|e| anyhow!("Failed to build viewport params: {}", e))?;
    page.execute(emulation_params)
        .await
        .map_err(|e| anyhow!("Failed to set viewport: {}", e))?;

    page.execute(AddBindingParams::new(CAPTURE_BINDING))
        .await
        .map_err(|e| anyhow!("Failed to add binding '{}': {}", CAPTURE_BINDING, e))?;
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(PAGE_RUNTIME))
        .await
        .map_err(|e| anyhow!("Failed to register page runtime: {}", e))?;
    page.execute(NetworkEnableParams::default())
        .await
        .map_err(|e| anyhow!("Failed to enable network events: {}", e))?;

    let bindings = page
        .event_listener::<EventBindingCalled>()
        .await
        .map_err(|e| anyhow!("Failed to create binding listener: {}", e))?;
    let navigations = page
        .event_listener::<EventFrameNavigated>()
        .await
        .map_err(|e| anyhow!("Failed to create navigation listener: {}", e))?;
    let requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(|e| anyhow!("Failed to create request listener: {}", e))?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let origin_ms = Utc::now().timestamp_millis();
    let forwarder = tokio::spawn(forward_events(
        page_events(bindings),
        navigation_events(navigations),
        request_events(requests),
        origin_ms,
        tx,
    ));

    page.goto(options.url.as_str())
        .await
        .map_err(|e| anyhow!("Failed to navigate to {}: {}", options.url, e))?;

    Ok((page, rx, forwarder))
}

type EventFeed = BoxStream<'static, CapturedEvent>;

/// Events the page runtime pushed through the capture binding, stamped
/// in-page
fn page_events(bindings: EventStream<EventBindingCalled>) -> EventFeed {
    bindings
        .filter_map(|binding| {
            let event = if binding.name != CAPTURE_BINDING {
                None
            } else {
                match serde_json::from_str::<CapturedEvent>(&binding.payload) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        tracing::warn!("Dropping malformed capture payload: {}", e);
                        None
                    }
                }
            };
            future::ready(event)
        })
        .boxed()
}

/// Main-frame navigations, stamped on receipt
fn navigation_events(navigations: EventStream<EventFrameNavigated>) -> EventFeed {
    navigations
        .filter_map(|nav| {
            // Sub-frame navigations are not page navigations
            let event = if nav.frame.parent_id.is_some() || nav.frame.url == "about:blank" {
                None
            } else {
                let mut event = CapturedEvent::new(CapturedEventType::Navigation);
                event.url = Some(nav.frame.url.clone());
                event.epoch_ms = Some(Utc::now().timestamp_millis());
                Some(event)
            };
            future::ready(event)
        })
        .boxed()
}

/// Fetch and XHR requests, stamped with the request's wall time
fn request_events(requests: EventStream<EventRequestWillBeSent>) -> EventFeed {
    requests
        .filter_map(|req| {
            let event = if !matches!(req.r#type, Some(ResourceType::Fetch) | Some(ResourceType::Xhr)) {
                None
            } else {
                let mut event = CapturedEvent::new(CapturedEventType::Request);
                event.url = Some(req.request.url.clone());
                event.method = Some(req.request.method.clone());
                event.epoch_ms = Some((*req.wall_time.inner() * 1000.0) as i64);
                Some(event)
            };
            future::ready(event)
        })
        .boxed()
}

/// Merge the feeds into one ordered stream relative to `origin_ms`.
///
/// When several feeds are ready at once, page events go first, then
/// navigations, then requests, so a click precedes the navigation it
/// triggered.
async fn forward_events(
    mut page_events: EventFeed,
    mut navigations: EventFeed,
    mut requests: EventFeed,
    origin_ms: i64,
    tx: mpsc::Sender<CapturedEvent>,
) {
    loop {
        let mut event = tokio::select! {
            biased;
            Some(event) = page_events.next() => event,
            Some(event) = navigations.next() => event,
            Some(event) = requests.next() => event,
            else => break,
        };

        event.stamp(origin_ms, Utc::now().timestamp_millis());
        if tx.send(event).await.is_err() {
            break;
        }
    }

    tracing::debug!("CDP event forwarding stopped");
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn describe(&self, element: ElementHandle) -> Result<ElementDescriptor> {
        let value = self.evaluate(&describe_expression(element.0)).await?;
        let descriptor: ElementDescriptor = serde_json::from_value(value)
            .map_err(|e| anyhow!("Failed to parse descriptor of {}: {}", element, e))?;
        Ok(descriptor.normalized())
    }

    async fn resolve(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let value = self.evaluate(&resolve_expression(selector)).await?;
        let ids: Vec<u64> = serde_json::from_value(value)
            .map_err(|e| anyhow!("Failed to parse matches for '{}': {}", selector, e))?;
        Ok(ids.into_iter().map(ElementHandle).collect())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| anyhow!("Failed to evaluate script: {}", e))?;

        result
            .into_value()
            .map_err(|e| anyhow!("Failed to parse script result: {}", e))
    }
}

/// A running Chrome instance with its recording page
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Arc<ChromiumPage>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn page(&self) -> Arc<dyn PageDriver> {
        self.page.clone()
    }

    async fn close(&self) -> Result<()> {
        let mut browser_guard = self.browser.lock().await;

        if let Err(e) = self.page.page.clone().close().await {
            tracing::warn!("Failed to close recording page: {}", e);
        }

        let mut result = Ok(());
        if let Some(mut browser) = browser_guard.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser: {}", e);
                result = Err(anyhow!("Failed to close browser: {}", e));
            }
        }

        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        if result.is_ok() {
            tracing::info!("Browser closed");
        }
        result
    }
}
