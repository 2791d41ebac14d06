//! The diagnostics handle
//!
//! [`Diagnostics`] owns every background thread and registry. Create it once
//! at start-up, share it (it is `Send + Sync`, wrap it in an `Arc`), and drop
//! it (or call [`Diagnostics::shutdown`]) on the way out. Shutdown is the exit
//! hook: it stops every tracker, flushes pending messages and joins all
//! workers. Statics are never dropped, so a handle kept in one must be shut
//! down explicitly.
//!
//! After shutdown, messages are ignored by the stopped dispatcher, beep
//! requests are dropped and `start_tracking` returns `None`.
//!
//! Producer calls never block on I/O: messages and beeps are queued,
//! trackers get their own thread.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::alert::{SystemAlert, SystemBell};
use crate::audio::beep::BeepPlayer;
use crate::audio::output::{AudioOutput, CpalOutput};
use crate::audio::tone::{ToneLength, TonePitch};
use crate::audio::tracker::{Observable, TrackerHandle, TrackerRegistry};
use crate::category::CategoryRegistry;
use crate::config::{DiagnosticsConfig, LogStyle, LoggerConfig, TrackerConfig};
use crate::console::{ConsoleSink, TerminalConsole};
use crate::constants::DISPATCH_POLL_MS;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::event::{LogEvent, Severity};
use crate::queue::{create_shared_queue, QueueStats, SharedQueue};
use crate::sink::LogSink;
use crate::worker::{RunFlag, Worker};
use crossterm::style::Color;

/// Builder for [`Diagnostics`]
///
/// Every collaborator defaults to the real thing: cpal audio, the ANSI
/// terminal and the native alert beep.
#[derive(Default)]
pub struct DiagnosticsBuilder {
    config: DiagnosticsConfig,
    output: Option<Arc<dyn AudioOutput>>,
    console: Option<Box<dyn ConsoleSink>>,
    alert: Option<Box<dyn SystemAlert>>,
}

impl DiagnosticsBuilder {
    pub fn config(mut self, config: DiagnosticsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.config.logger = logger;
        self
    }

    pub fn tracker(mut self, tracker: TrackerConfig) -> Self {
        self.config.tracker = tracker;
        self
    }

    pub fn audio_output(mut self, output: impl AudioOutput + 'static) -> Self {
        self.output = Some(Arc::new(output));
        self
    }

    pub fn console(mut self, console: impl ConsoleSink + 'static) -> Self {
        self.console = Some(Box::new(console));
        self
    }

    pub fn alert(mut self, alert: impl SystemAlert + 'static) -> Self {
        self.alert = Some(Box::new(alert));
        self
    }

    /// Start the dispatcher and beep threads, and the log sink if the
    /// logger config asks for it
    pub fn build(self) -> Result<Diagnostics> {
        let DiagnosticsBuilder {
            config,
            output,
            console,
            alert,
        } = self;

        let output = output
            .unwrap_or_else(|| Arc::new(CpalOutput::new(config.audio.output_device.clone())));
        let console = console.unwrap_or_else(|| Box::new(TerminalConsole::new()));
        let alert = alert.unwrap_or_else(|| Box::new(SystemBell));

        let start_logging = config.logger.active;
        let logger = Arc::new(RwLock::new(LoggerConfig {
            active: false,
            ..config.logger
        }));

        let events = create_shared_queue::<LogEvent>();
        let log_queue = create_shared_queue::<LogEvent>();
        let categories = Arc::new(CategoryRegistry::new());

        let dispatcher = Dispatcher::new(
            events.clone(),
            log_queue.clone(),
            categories.clone(),
            logger.clone(),
            console,
            alert,
        );
        let dispatcher = Worker::spawn("message-dispatcher", RunFlag::new(), move |flag| {
            dispatcher.run(flag, Duration::from_millis(DISPATCH_POLL_MS))
        })?;

        let beeps = BeepPlayer::start(output.clone())?;

        let mut log_sink = LogSink::new(log_queue, logger.clone());
        if start_logging {
            log_sink.start()?;
        }

        tracing::info!("Diagnostics started");

        Ok(Diagnostics {
            events,
            categories,
            logger,
            tracker_config: config.tracker,
            output,
            trackers: Arc::new(TrackerRegistry::new()),
            beeps,
            log_sink: Mutex::new(log_sink),
            dispatcher: Mutex::new(Some(dispatcher)),
            shut_down: AtomicBool::new(false),
        })
    }
}

/// In-process diagnostics: console/file messages, beeps and value trackers
pub struct Diagnostics {
    events: SharedQueue<LogEvent>,
    categories: Arc<CategoryRegistry>,
    logger: Arc<RwLock<LoggerConfig>>,
    tracker_config: TrackerConfig,
    output: Arc<dyn AudioOutput>,
    trackers: Arc<TrackerRegistry>,
    beeps: BeepPlayer,
    log_sink: Mutex<LogSink>,
    dispatcher: Mutex<Option<Worker>>,
    shut_down: AtomicBool,
}

impl Diagnostics {
    pub fn builder() -> DiagnosticsBuilder {
        DiagnosticsBuilder::default()
    }

    /// Start with an explicit configuration and the real collaborators
    pub fn new(config: DiagnosticsConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Start with the per-user config file, or defaults
    pub fn from_default_config() -> Result<Self> {
        Self::new(DiagnosticsConfig::load_or_default())
    }

    // Messages

    /// Queue an event for dispatch
    pub fn emit(&self, event: impl Into<LogEvent>) {
        self.events.push(event.into());
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(LogEvent::new(text));
    }

    pub fn message_in(&self, text: impl Into<String>, category: impl Into<String>) {
        self.emit(LogEvent::new(text).in_category(category));
    }

    pub fn colored(&self, text: impl Into<String>, color: Color) {
        self.emit(LogEvent::new(text).with_color(color));
    }

    pub fn colored_in(&self, text: impl Into<String>, color: Color, category: impl Into<String>) {
        self.emit(LogEvent::new(text).with_color(color).in_category(category));
    }

    pub fn with_severity(&self, text: impl Into<String>, severity: Severity) {
        self.emit(LogEvent::new(text).with_severity(severity));
    }

    pub fn with_severity_in(
        &self,
        text: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
    ) {
        self.emit(LogEvent::new(text).with_severity(severity).in_category(category));
    }

    /// Counters of the message queue
    pub fn message_stats(&self) -> QueueStats {
        self.events.stats()
    }

    // Beeps

    /// Queue a beep; beeps play one after another
    pub fn request_beep(&self, pitch: TonePitch, length: ToneLength) {
        if self.is_shut_down() {
            tracing::debug!("Beep requested after shutdown");
            return;
        }
        self.beeps.request(pitch, length);
    }

    pub fn pending_beeps(&self) -> usize {
        self.beeps.pending()
    }

    // Trackers

    /// Sonify `cell` within `[lower, upper]`
    ///
    /// Returns `None` when no audio output can be opened, or once the
    /// handle has been shut down.
    pub fn start_tracking<T>(&self, cell: Arc<T>, lower: f64, upper: f64) -> Option<TrackerHandle>
    where
        T: Observable + 'static,
    {
        if self.is_shut_down() {
            tracing::debug!("Tracking requested after shutdown");
            return None;
        }

        let handle = self.trackers.start(
            cell,
            lower,
            upper,
            self.output.as_ref(),
            &self.tracker_config,
        )?;

        // A shutdown racing this call may have swept the registry before the insert
        if self.is_shut_down() {
            handle.wait();
            return None;
        }
        Some(handle)
    }

    /// Trackers still running
    pub fn active_trackers(&self) -> usize {
        self.trackers.len()
    }

    /// Stop every tracker, waiting for each to finish its cycle
    pub fn stop_all_trackers(&self) -> usize {
        self.trackers.stop_all()
    }

    // Categories

    pub fn add_category(&self, name: &str) {
        self.categories.add(name);
    }

    pub fn remove_category(&self, name: &str) -> bool {
        self.categories.remove(name)
    }

    pub fn activate_category(&self, name: &str) {
        self.categories.activate(name);
    }

    pub fn deactivate_category(&self, name: &str) {
        self.categories.deactivate(name);
    }

    pub fn is_category_active(&self, name: &str) -> bool {
        self.categories.is_active(name)
    }

    pub fn categories(&self) -> Vec<String> {
        self.categories.names()
    }

    // Durable logging

    /// Begin appending to `log.csv` / `log.txt`
    pub fn start_logging(&self) -> Result<()> {
        self.log_sink.lock().start()
    }

    /// Stop appending; queued lines are kept for the next start
    pub fn stop_logging(&self) {
        self.log_sink.lock().stop();
    }

    pub fn is_logging(&self) -> bool {
        self.log_sink.lock().is_running()
    }

    // Configuration

    /// Snapshot of the logger settings
    pub fn config(&self) -> LoggerConfig {
        self.logger.read().clone()
    }

    /// Change logger settings in place
    ///
    /// `active` is owned by start/stop logging and is restored after `f`.
    pub fn update_config(&self, f: impl FnOnce(&mut LoggerConfig)) {
        let mut config = self.logger.write();
        let active = config.active;
        f(&mut config);
        config.active = active;
    }

    pub fn set_log_style(&self, style: LogStyle) {
        self.update_config(|c| c.style = style);
    }

    pub fn set_include_timestamp(&self, include: bool) {
        self.update_config(|c| c.include_timestamp = include);
    }

    pub fn set_include_category(&self, include: bool) {
        self.update_config(|c| c.include_category = include);
    }

    pub fn set_emit_console_messages(&self, emit: bool) {
        self.update_config(|c| c.emit_console_messages = emit);
    }

    // Lifecycle

    /// Stop trackers, flush and join every worker; idempotent
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.trackers.stop_all();

        // Dispatcher flushes its queue into the console and log queue on exit
        if let Some(mut dispatcher) = self.dispatcher.lock().take() {
            dispatcher.stop();
        }
        self.log_sink.lock().stop_and_flush();
        self.beeps.stop();

        tracing::info!("Diagnostics shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for Diagnostics {
    fn drop(&mut self) {
        self.shutdown();
    }
}
