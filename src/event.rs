//! Log events produced by the host application

use chrono::{DateTime, Local};
use crossterm::style::Color;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CATEGORY;

/// How serious a message is; drives console styling and the system alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    General,
    Warning,
    Critical,
    Debug,
}

impl Severity {
    /// Tag written to the log file
    pub fn tag(self) -> &'static str {
        match self {
            Severity::General => "General",
            Severity::Warning => "Warning",
            Severity::Critical => "Error",
            Severity::Debug => "Debug",
        }
    }

    /// Banner printed in front of the message on the console
    ///
    /// Debug gets its own `*Debug*` banner rather than sharing the General
    /// one, so the two stay distinguishable on screen.
    pub fn banner(self) -> &'static str {
        match self {
            Severity::Critical => "\u{25B2}\u{25B2} Error \u{25B2}\u{25B2}",
            Severity::Warning => "\u{203C} Warning \u{203C}",
            Severity::General => "*General*",
            Severity::Debug => "*Debug*",
        }
    }
}

/// A single diagnostics message
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub message: String,
    pub color: Option<Color>,
    pub severity: Option<Severity>,
    pub category: String,
    pub created_at: DateTime<Local>,
}

impl LogEvent {
    /// Plain message in the default category, stamped now
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            color: None,
            severity: None,
            category: DEFAULT_CATEGORY.to_string(),
            created_at: Local::now(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn at(mut self, created_at: DateTime<Local>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Log-file tag; events without a severity log as `Debug`
    pub fn tag(&self) -> &'static str {
        self.severity.unwrap_or(Severity::Debug).tag()
    }

    pub fn timestamp(&self, format: &str) -> String {
        self.created_at.format(format).to_string()
    }
}

impl From<&str> for LogEvent {
    fn from(message: &str) -> Self {
        LogEvent::new(message)
    }
}

impl From<String> for LogEvent {
    fn from(message: String) -> Self {
        LogEvent::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let event = LogEvent::new("hello");
        assert_eq!(event.category, DEFAULT_CATEGORY);
        assert!(event.color.is_none());
        assert!(event.severity.is_none());
        assert_eq!(event.tag(), "Debug");
    }

    #[test]
    fn test_builder() {
        let event = LogEvent::from("ping")
            .with_severity(Severity::Critical)
            .with_color(Color::Cyan)
            .in_category("Net");

        assert_eq!(event.tag(), "Error");
        assert_eq!(event.color, Some(Color::Cyan));
        assert_eq!(event.category, "Net");
    }

    #[test]
    fn test_banners() {
        assert_eq!(Severity::Critical.banner(), "▲▲ Error ▲▲");
        assert_eq!(Severity::Warning.banner(), "‼ Warning ‼");
        assert_eq!(Severity::General.banner(), "*General*");
        assert_eq!(Severity::Debug.banner(), "*Debug*");
        assert_ne!(Severity::Debug.banner(), Severity::General.banner());
    }
}
