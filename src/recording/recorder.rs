use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

use crate::browser::{BrowserLauncher, BrowserSession, ElementHandle, LaunchOptions, PageDriver};
use crate::codegen::{ArtifactWriter, CodeEmitter, TestMetadata};
use crate::config::Config;
use crate::error::RecorderError;
use crate::models::{
    Action, ActionRecord, CapturedEvent, RecorderState, RecordingReport, RecordingStatus,
    RecordingSummary, SelectorKind, SelectorResult,
};
use crate::page_object::{PageGroup, PageObjectSynthesizer};
use crate::parser::ActionParser;
use crate::selector::{strategies, SelectorGenerator};

use super::accumulator::PageAccumulator;

const EVENT_CAPACITY: usize = 256;

/// Notifications streamed while a session is active
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecorderEvent {
    Status { session_id: String, message: String },
    Action { session_id: String, record: ActionRecord },
    Error { session_id: String, error: String },
}

/// Per-session start parameters
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub url: String,
    pub test_name: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub dry_run: bool,
}

impl StartOptions {
    /// Options with the recorder's configured defaults
    pub fn new(url: impl Into<String>, test_name: impl Into<String>, config: &Config) -> Self {
        Self {
            url: url.into(),
            test_name: test_name.into(),
            headless: config.recording.headless,
            viewport_width: config.recording.viewport_width,
            viewport_height: config.recording.viewport_height,
            dry_run: config.recording.dry_run,
        }
    }
}

/// Everything appended while recording
#[derive(Debug, Default)]
struct SessionBuffer {
    records: Vec<ActionRecord>,
    pages: PageAccumulator,
    current_url: String,
    last_timestamp: u64,
}

struct ActiveSession {
    id: String,
    test_name: String,
    start_url: String,
    dry_run: bool,
    started: Instant,
    started_at: DateTime<Utc>,
    browser: Box<dyn BrowserSession>,
    buffer: Arc<Mutex<SessionBuffer>>,
    active: Arc<AtomicBool>,
    shutdown: oneshot::Sender<()>,
    consumer: JoinHandle<()>,
}

/// Recording session owner: `idle -> recording -> stopping -> idle`.
///
/// Only one session can be active at a time; a second `start` fails
/// immediately.
pub struct Recorder {
    launcher: Arc<dyn BrowserLauncher>,
    config: Config,
    busy: AtomicBool,
    state: Mutex<RecorderState>,
    session: Mutex<Option<ActiveSession>>,
    events: broadcast::Sender<RecorderEvent>,
}

impl Recorder {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: Config) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            launcher,
            config,
            busy: AtomicBool::new(false),
            state: Mutex::new(RecorderState::Idle),
            session: Mutex::new(None),
            events,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> RecorderState {
        *self.state.lock().await
    }

    fn notify(&self, event: RecorderEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Launch the browser and begin capturing. Returns the session id.
    pub async fn start(&self, options: StartOptions) -> Result<String, RecorderError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RecorderError::AlreadyRecording);
        }

        match self.launch(options).await {
            Ok(id) => Ok(id),
            Err(e) => {
                self.busy.store(false, Ordering::SeqCst);
                tracing::error!("Failed to start recording: {}", e);
                Err(e)
            }
        }
    }

    async fn launch(&self, options: StartOptions) -> Result<String, RecorderError> {
        Url::parse(&options.url)
            .map_err(|e| RecorderError::Launch(format!("invalid start URL '{}': {}", options.url, e)))?;

        let launched = self
            .launcher
            .launch(&LaunchOptions {
                url: options.url.clone(),
                headless: options.headless,
                viewport_width: options.viewport_width,
                viewport_height: options.viewport_height,
            })
            .await
            .map_err(|e| RecorderError::Launch(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let buffer = Arc::new(Mutex::new(SessionBuffer {
            current_url: options.url.clone(),
            ..Default::default()
        }));
        let active = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let started = Instant::now();

        let consumer = tokio::spawn(consume_events(EventLoop {
            session_id: id.clone(),
            events: launched.events,
            page: launched.session.page(),
            generator: SelectorGenerator::new(self.config.selector.clone()),
            buffer: Arc::clone(&buffer),
            active: Arc::clone(&active),
            notifier: self.events.clone(),
            started,
            shutdown: shutdown_rx,
        }));

        *self.session.lock().await = Some(ActiveSession {
            id: id.clone(),
            test_name: options.test_name.clone(),
            start_url: options.url.clone(),
            dry_run: options.dry_run,
            started,
            started_at: Utc::now(),
            browser: launched.session,
            buffer,
            active,
            shutdown: shutdown_tx,
            consumer,
        });
        *self.state.lock().await = RecorderState::Recording;

        tracing::info!(
            "Recording {} started: '{}' at {}",
            id,
            options.test_name,
            options.url
        );
        self.notify(RecorderEvent::Status {
            session_id: id.clone(),
            message: format!("Recording started at {}", options.url),
        });
        Ok(id)
    }

    /// Stop capturing, generate artifacts and release the browser.
    ///
    /// The recorder is back in `idle` when this returns, whether or not
    /// generation succeeded; failures are listed in the summary.
    pub async fn stop(&self) -> Result<RecordingSummary, RecorderError> {
        let session = self
            .session
            .lock()
            .await
            .take()
            .ok_or(RecorderError::NotRecording)?;
        *self.state.lock().await = RecorderState::Stopping;

        // Events already delivered are drained; later sends are refused
        session.active.store(false, Ordering::SeqCst);
        let _ = session.shutdown.send(());
        if let Err(e) = session.consumer.await {
            tracing::warn!("Event consumer for {} ended abnormally: {}", session.id, e);
        }

        let duration_seconds = session.started.elapsed().as_secs_f64();
        let (records, groups) = {
            let mut buffer = session.buffer.lock().await;
            let buffer = std::mem::take(&mut *buffer);
            (buffer.records, buffer.pages.into_groups())
        };
        tracing::info!(
            "Recording {} stopping with {} actions across {} pages",
            session.id,
            records.len(),
            groups.len()
        );

        let job = GenerationJob {
            session_id: session.id.clone(),
            test_name: session.test_name.clone(),
            start_url: session.start_url.clone(),
            started_at: session.started_at,
            duration_seconds,
            dry_run: session.dry_run,
            records,
            groups,
            parser: ActionParser::new(self.config.parser.clone()),
            writer: ArtifactWriter::new(self.config.recording.output_dir.clone()),
        };
        let fallback = RecordingSummary {
            session_id: session.id.clone(),
            test_name: session.test_name.clone(),
            action_count: job.records.len(),
            duration_seconds,
            ..Default::default()
        };

        // A panic in generation must not skip browser release
        let mut summary = match tokio::spawn(generate_artifacts(job)).await {
            Ok(summary) => summary,
            Err(e) => {
                let mut summary = fallback;
                summary
                    .errors
                    .push(RecorderError::Generation(e.to_string()).to_string());
                summary
            }
        };

        if let Err(e) = session.browser.close().await {
            let error = RecorderError::Browser(e.to_string());
            tracing::warn!("{}", error);
            summary.errors.push(error.to_string());
        }

        for error in &summary.errors {
            tracing::error!("Recording {}: {}", session.id, error);
            self.notify(RecorderEvent::Error {
                session_id: session.id.clone(),
                error: error.clone(),
            });
        }

        *self.state.lock().await = RecorderState::Idle;
        self.busy.store(false, Ordering::SeqCst);

        tracing::info!(
            "Recording {} stopped: {} actions, {} steps, {:.1}s",
            session.id,
            summary.action_count,
            summary.step_count,
            summary.duration_seconds
        );
        self.notify(RecorderEvent::Status {
            session_id: session.id.clone(),
            message: "Recording stopped".to_string(),
        });
        Ok(summary)
    }

    pub async fn status(&self) -> RecordingStatus {
        let state = *self.state.lock().await;
        let guard = self.session.lock().await;
        match guard.as_ref() {
            Some(session) => {
                let buffer = session.buffer.lock().await;
                RecordingStatus {
                    state,
                    session_id: Some(session.id.clone()),
                    test_name: Some(session.test_name.clone()),
                    current_url: Some(buffer.current_url.clone()),
                    action_count: buffer.records.len(),
                    elapsed_seconds: session.started.elapsed().as_secs_f64(),
                }
            }
            None => RecordingStatus {
                state,
                session_id: None,
                test_name: None,
                current_url: None,
                action_count: 0,
                elapsed_seconds: 0.0,
            },
        }
    }
}

struct EventLoop {
    session_id: String,
    events: mpsc::Receiver<CapturedEvent>,
    page: Arc<dyn PageDriver>,
    generator: SelectorGenerator,
    buffer: Arc<Mutex<SessionBuffer>>,
    active: Arc<AtomicBool>,
    notifier: broadcast::Sender<RecorderEvent>,
    started: Instant,
    shutdown: oneshot::Receiver<()>,
}

/// Single consumer: each event is fully handled, selector generation
/// included, before the next one is taken off the channel.
///
/// On shutdown the channel is closed to further sends and whatever the
/// browser already delivered is still recorded.
async fn consume_events(mut ctx: EventLoop) {
    let mut stopping = false;

    loop {
        let event = tokio::select! {
            biased;
            _ = &mut ctx.shutdown => {
                stopping = true;
                break;
            }
            maybe = ctx.events.recv() => match maybe {
                Some(event) => event,
                None => {
                    if ctx.active.load(Ordering::SeqCst) {
                        tracing::warn!("Browser event stream for {} ended", ctx.session_id);
                        let _ = ctx.notifier.send(RecorderEvent::Error {
                            session_id: ctx.session_id.clone(),
                            error: "Browser event stream ended".to_string(),
                        });
                    }
                    break;
                }
            },
        };

        record_event(&ctx, &event).await;
    }

    if stopping {
        ctx.events.close();
        let mut drained = 0;
        while let Some(event) = ctx.events.recv().await {
            record_event(&ctx, &event).await;
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!("Recorded {} queued events for {} after stop", drained, ctx.session_id);
        }
    }

    tracing::debug!("Event consumer for {} stopped", ctx.session_id);
}

async fn record_event(ctx: &EventLoop, event: &CapturedEvent) {
    if let Some(record) = build_record(ctx, event).await {
        append(ctx, record).await;
    }
}

async fn build_record(ctx: &EventLoop, event: &CapturedEvent) -> Option<ActionRecord> {
    let Some(action) = event.to_action() else {
        tracing::debug!("Skipping incomplete {:?} event", event.event_type);
        return None;
    };

    let timestamp = {
        let buffer = ctx.buffer.lock().await;
        let raw = event
            .timestamp_ms
            .unwrap_or_else(|| ctx.started.elapsed().as_millis() as u64);
        raw.max(buffer.last_timestamp)
    };
    let page_url = match &action {
        Action::Navigation { url } => url.clone(),
        _ => ctx.buffer.lock().await.current_url.clone(),
    };

    let mut record = ActionRecord::new(timestamp, page_url, action);
    if !event.is_element_bound() {
        return Some(record);
    }

    match (event.handle, &event.element) {
        (Some(handle), snapshot) => {
            let (selector, descriptor) = ctx
                .generator
                .generate_with_snapshot(ctx.page.as_ref(), ElementHandle(handle), snapshot.as_ref())
                .await;
            record.selector = Some(selector);
            record.element = descriptor;
        }
        (None, Some(snapshot)) => {
            record.selector = Some(SelectorResult::unvalidated(
                strategies::positional_xpath(Some(snapshot)),
                SelectorKind::Xpath,
                0.1,
            ));
            record.element = Some(snapshot.clone());
        }
        (None, None) => {}
    }
    Some(record)
}

async fn append(ctx: &EventLoop, record: ActionRecord) {
    {
        let mut buffer = ctx.buffer.lock().await;
        if let Action::Navigation { url } = &record.action {
            buffer.current_url = url.clone();
        }
        buffer.last_timestamp = record.timestamp;
        buffer.pages.record(&record);
        buffer.records.push(record.clone());
    }

    tracing::debug!(
        "Recorded {} on {}{}",
        record.kind(),
        record.page_url,
        record
            .selector
            .as_ref()
            .map(|s| format!(" -> {}", s))
            .unwrap_or_default()
    );
    let _ = ctx.notifier.send(RecorderEvent::Action {
        session_id: ctx.session_id.clone(),
        record,
    });
}

/// Immutable snapshot handed to post-processing
struct GenerationJob {
    session_id: String,
    test_name: String,
    start_url: String,
    started_at: DateTime<Utc>,
    duration_seconds: f64,
    dry_run: bool,
    records: Vec<ActionRecord>,
    groups: BTreeMap<String, PageGroup>,
    parser: ActionParser,
    writer: ArtifactWriter,
}

/// Parse, synthesize, render and persist. Each artifact fails on its own;
/// earlier writes are kept.
async fn generate_artifacts(job: GenerationJob) -> RecordingSummary {
    let mut summary = RecordingSummary {
        session_id: job.session_id.clone(),
        test_name: job.test_name.clone(),
        action_count: job.records.len(),
        duration_seconds: job.duration_seconds,
        ..Default::default()
    };

    let steps = job.parser.parse(&job.records);
    summary.step_count = steps.len();
    let pages = PageObjectSynthesizer::new().synthesize(&job.groups);

    let emitter = match CodeEmitter::new() {
        Ok(emitter) => emitter,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    let mut files = Vec::new();

    for page in &pages {
        let source = match emitter.render_page_object(page) {
            Ok(source) => source,
            Err(e) => {
                summary.errors.push(e.to_string());
                continue;
            }
        };
        let path = job.writer.page_object_path(&page.file_name());
        if job.dry_run {
            summary.previews.insert(page.file_name(), source);
            continue;
        }
        match job.writer.write(&path, &source).await {
            Ok(path) => {
                files.push(path.clone());
                summary.page_object_paths.push(path);
            }
            Err(e) => summary.errors.push(e.to_string()),
        }
    }

    let meta = TestMetadata {
        test_name: job.test_name.clone(),
        start_url: job.start_url.clone(),
        imports: pages.iter().map(|p| p.name.clone()).collect(),
    };
    match emitter.render_test(&steps, &meta) {
        Ok(source) => {
            let path = job.writer.test_path(&job.test_name);
            if job.dry_run {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                summary.previews.insert(name, source);
            } else {
                match job.writer.write(&path, &source).await {
                    Ok(path) => {
                        files.insert(0, path.clone());
                        summary.test_file_path = Some(path);
                    }
                    Err(e) => summary.errors.push(e.to_string()),
                }
            }
        }
        Err(e) => summary.errors.push(e.to_string()),
    }

    let report = RecordingReport {
        test_name: job.test_name.clone(),
        url: job.start_url.clone(),
        timestamp: job.started_at,
        duration_seconds: job.duration_seconds,
        action_count: job.records.len(),
        files,
    };
    match emitter.render_report(&report) {
        Ok(json) if job.dry_run => {
            summary.previews.insert("report.json".to_string(), json);
        }
        Ok(json) => {
            let path = job.writer.report_path(&job.test_name);
            match job.writer.write(&path, &json).await {
                Ok(path) => summary.report_path = Some(path),
                Err(e) => summary.errors.push(e.to_string()),
            }
        }
        Err(e) => summary.errors.push(e.to_string()),
    }

    summary
}
