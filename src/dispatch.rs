//! Message dispatcher
//!
//! Single consumer of the event queue. Each event is first copied to the
//! log sink queue (when durable logging is on) and then, if its category is
//! active and console output is enabled, rendered to the console.

use parking_lot::RwLock;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::alert::{AlertKind, SystemAlert};
use crate::category::CategoryRegistry;
use crate::config::LoggerConfig;
use crate::console::{render_event, ConsoleSink};
use crate::event::LogEvent;
use crate::queue::SharedQueue;
use crate::worker::RunFlag;

/// State the dispatcher loop works on
pub struct Dispatcher {
    events: SharedQueue<LogEvent>,
    log_queue: SharedQueue<LogEvent>,
    categories: Arc<CategoryRegistry>,
    config: Arc<RwLock<LoggerConfig>>,
    console: Box<dyn ConsoleSink>,
    alert: Box<dyn SystemAlert>,
}

impl Dispatcher {
    pub fn new(
        events: SharedQueue<LogEvent>,
        log_queue: SharedQueue<LogEvent>,
        categories: Arc<CategoryRegistry>,
        config: Arc<RwLock<LoggerConfig>>,
        console: Box<dyn ConsoleSink>,
        alert: Box<dyn SystemAlert>,
    ) -> Self {
        Self {
            events,
            log_queue,
            categories,
            config,
            console,
            alert,
        }
    }

    /// Dispatch at most one event; returns false when the queue was empty
    pub fn step(&mut self) -> bool {
        let Some(event) = self.events.pop() else {
            return false;
        };

        // Snapshot so producers can reconfigure while we render
        let config = self.config.read().clone();

        if config.active {
            self.log_queue.push(event.clone());
        }

        if !config.emit_console_messages || !self.categories.is_active(&event.category) {
            return true;
        }

        let line = render_event(&event, &config);
        if let Err(e) = self.console.write_line(&line) {
            tracing::debug!("Console write failed: {}", e);
        }

        if event.color.is_none() {
            if let Some(kind) = event.severity.and_then(AlertKind::for_severity) {
                self.alert.alert(kind);
            }
        }

        true
    }

    /// Dispatch everything currently queued
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.step() {
            count += 1;
        }
        count
    }

    /// Worker body: poll until stopped, then flush what is left
    pub fn run(mut self, flag: RunFlag, idle: Duration) {
        while flag.is_running() {
            if !self.step() {
                thread::sleep(idle);
            }
        }
        let flushed = self.drain();
        if flushed > 0 {
            tracing::debug!("Dispatcher flushed {} message(s) on shutdown", flushed);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::console::RenderedLine;
    use crate::event::Severity;
    use crate::queue::create_shared_queue;
    use parking_lot::Mutex;
    use std::io;

    /// Console that keeps the plain text of every line
    #[derive(Clone, Default)]
    pub(crate) struct RecordingConsole {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    impl ConsoleSink for RecordingConsole {
        fn write_line(&mut self, line: &RenderedLine) -> io::Result<()> {
            self.lines.lock().push(line.text());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingAlert {
        pub alerts: Arc<Mutex<Vec<AlertKind>>>,
    }

    impl SystemAlert for RecordingAlert {
        fn alert(&mut self, kind: AlertKind) {
            self.alerts.lock().push(kind);
        }
    }

    struct Fixture {
        events: SharedQueue<LogEvent>,
        log_queue: SharedQueue<LogEvent>,
        categories: Arc<CategoryRegistry>,
        config: Arc<RwLock<LoggerConfig>>,
        console: RecordingConsole,
        alert: RecordingAlert,
        dispatcher: Dispatcher,
    }

    fn fixture() -> Fixture {
        let events = create_shared_queue();
        let log_queue = create_shared_queue();
        let categories = Arc::new(CategoryRegistry::new());
        let config = Arc::new(RwLock::new(LoggerConfig {
            include_timestamp: false,
            ..LoggerConfig::default()
        }));
        let console = RecordingConsole::default();
        let alert = RecordingAlert::default();
        let dispatcher = Dispatcher::new(
            events.clone(),
            log_queue.clone(),
            categories.clone(),
            config.clone(),
            Box::new(console.clone()),
            Box::new(alert.clone()),
        );
        Fixture {
            events,
            log_queue,
            categories,
            config,
            console,
            alert,
            dispatcher,
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut f = fixture();
        for i in 0..20 {
            f.events.push(LogEvent::new(format!("msg {}", i)));
        }
        assert_eq!(f.dispatcher.drain(), 20);

        let lines = f.console.lines.lock();
        let expected: Vec<String> = (0..20).map(|i| format!("msg {}", i)).collect();
        assert_eq!(*lines, expected);
    }

    #[test]
    fn test_inactive_category_still_logged() {
        let mut f = fixture();
        f.config.write().active = true;
        f.categories.add("Net");
        f.categories.deactivate("Net");

        f.events.push(LogEvent::new("hidden").in_category("Net"));
        f.events.push(LogEvent::new("shown"));
        f.dispatcher.drain();

        assert_eq!(*f.console.lines.lock(), vec!["shown".to_string()]);
        assert_eq!(f.log_queue.len(), 2);
        assert_eq!(f.log_queue.pop().unwrap().message, "hidden");
    }

    #[test]
    fn test_console_disabled() {
        let mut f = fixture();
        f.config.write().emit_console_messages = false;
        f.events.push(LogEvent::new("quiet").with_severity(Severity::Critical));
        f.dispatcher.drain();

        assert!(f.console.lines.lock().is_empty());
        assert!(f.alert.alerts.lock().is_empty());
        assert!(f.log_queue.is_empty());
    }

    #[test]
    fn test_alerts_follow_severity() {
        let mut f = fixture();
        f.events.push(LogEvent::new("a").with_severity(Severity::Warning));
        f.events.push(LogEvent::new("b").with_severity(Severity::Critical));
        f.events.push(LogEvent::new("c").with_severity(Severity::Debug));
        f.events.push(LogEvent::new("d").with_severity(Severity::General).with_color(crossterm::style::Color::Red));
        f.dispatcher.drain();

        assert_eq!(*f.alert.alerts.lock(), vec![AlertKind::Warning, AlertKind::Error]);
        assert_eq!(f.console.lines.lock().len(), 4);
    }

    #[test]
    fn test_empty_queue() {
        let mut f = fixture();
        assert!(!f.dispatcher.step());
    }
}
