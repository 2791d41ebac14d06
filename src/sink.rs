//! Durable log sink
//!
//! Events copied here by the dispatcher are appended to `log.csv` or
//! `log.txt`. The file is reopened for every line, so nothing already
//! written is lost if the host dies between events. Write failures are
//! dropped on the floor; diagnostics must never take the host down.

use parking_lot::{Mutex, RwLock};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LogStyle, LoggerConfig};
use crate::constants::LOG_SINK_POLL_MS;
use crate::error::Error;
use crate::event::LogEvent;
use crate::queue::SharedQueue;
use crate::worker::Worker;

/// CSV header for the enabled columns
pub fn csv_header(config: &LoggerConfig) -> String {
    let mut columns = Vec::with_capacity(4);
    if config.include_timestamp {
        columns.push("Timestamp");
    }
    columns.push("Tag");
    if config.include_category {
        columns.push("Category");
    }
    columns.push("Message");
    columns.join(",")
}

/// Quote a CSV field when it would otherwise split the row
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// `[timestamp,]tag,[(category),]message`
pub fn format_csv(event: &LogEvent, config: &LoggerConfig) -> String {
    let mut fields: Vec<Cow<'_, str>> = Vec::with_capacity(4);
    if config.include_timestamp {
        fields.push(Cow::Owned(event.timestamp(&config.timestamp_format)));
    }
    fields.push(Cow::Borrowed(event.tag()));
    if config.include_category {
        let category = format!("({})", event.category);
        fields.push(Cow::Owned(csv_field(&category).into_owned()));
    }
    fields.push(csv_field(&event.message));
    fields.join(",")
}

/// `[timestamp: ]tag[ (category)] message`
pub fn format_plain(event: &LogEvent, config: &LoggerConfig) -> String {
    let mut line = String::new();
    if config.include_timestamp {
        line.push_str(&event.timestamp(&config.timestamp_format));
        line.push_str(": ");
    }
    line.push_str(event.tag());
    if config.include_category {
        line.push_str(" (");
        line.push_str(&event.category);
        line.push(')');
    }
    line.push(' ');
    line.push_str(&event.message);
    line
}

/// Format an event in the configured style
pub fn format_event(event: &LogEvent, config: &LoggerConfig) -> String {
    match config.style {
        LogStyle::Csv => format_csv(event, config),
        LogStyle::PlainText => format_plain(event, config),
    }
}

/// Append one line, creating the file if needed
pub fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Writer state for one logging activation
///
/// Each CSV file gets its header the first time the activation touches it,
/// so switching styles mid-run still yields a headed `log.csv`.
struct LogWriter {
    queue: SharedQueue<LogEvent>,
    config: Arc<RwLock<LoggerConfig>>,
    headed: HashSet<PathBuf>,
}

impl LogWriter {
    fn new(queue: SharedQueue<LogEvent>, config: Arc<RwLock<LoggerConfig>>) -> Self {
        Self {
            queue,
            config,
            headed: HashSet::new(),
        }
    }

    fn ensure_header(&mut self, config: &LoggerConfig) {
        if config.style != LogStyle::Csv {
            return;
        }
        let path = config.log_path();
        if self.headed.contains(&path) {
            return;
        }
        if let Err(e) = append_line(&path, &csv_header(config)) {
            tracing::debug!("Failed to write log header to {}: {}", path.display(), e);
        }
        self.headed.insert(path);
    }

    /// Write at most one queued event; returns false when the queue was empty
    fn write_next(&mut self) -> bool {
        let Some(event) = self.queue.pop() else {
            return false;
        };

        let config = self.config.read().clone();
        self.ensure_header(&config);

        let path = config.log_path();
        let line = format_event(&event, &config);
        if let Err(e) = append_line(&path, &line) {
            tracing::debug!("Dropped log line for {}: {}", path.display(), e);
        }
        true
    }
}

/// Owner of the log queue's consumer thread
pub struct LogSink {
    queue: SharedQueue<LogEvent>,
    config: Arc<RwLock<LoggerConfig>>,
    writer: Option<Arc<Mutex<LogWriter>>>,
    worker: Option<Worker>,
}

impl LogSink {
    pub fn new(queue: SharedQueue<LogEvent>, config: Arc<RwLock<LoggerConfig>>) -> Self {
        Self {
            queue,
            config,
            writer: None,
            worker: None,
        }
    }

    /// Start writing; no-op if already running
    ///
    /// A CSV header is written on every activation, even when the file
    /// already has one.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.is_running() {
            return Ok(());
        }

        let snapshot = self.config.read().clone();
        let writer = Arc::new(Mutex::new(LogWriter::new(
            self.queue.clone(),
            self.config.clone(),
        )));
        writer.lock().ensure_header(&snapshot);

        let writer_for_loop = writer.clone();
        let worker = Worker::spawn_polling(
            "log-sink",
            Duration::from_millis(LOG_SINK_POLL_MS),
            move || writer_for_loop.lock().write_next(),
        )?;

        self.writer = Some(writer);
        self.worker = Some(worker);
        self.config.write().active = true;
        tracing::info!("Durable logging started: {}", snapshot.log_path().display());
        Ok(())
    }

    /// Stop writing and join the worker
    ///
    /// Events still queued stay queued for the next activation.
    pub fn stop(&mut self) {
        self.config.write().active = false;
        self.writer = None;
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            tracing::info!("Durable logging stopped");
        }
    }

    /// Stop, then write whatever is still queued on the calling thread
    pub fn stop_and_flush(&mut self) {
        let writer = self.writer.clone();
        self.stop();
        if let Some(writer) = writer {
            let mut writer = writer.lock();
            while writer.write_next() {}
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(Worker::is_running)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        self.stop();
    }
}
