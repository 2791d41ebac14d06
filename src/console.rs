//! Console rendering
//!
//! [`render_event`] turns an event into styled segments; a [`ConsoleSink`]
//! puts them on screen. Keeping the two apart lets the dispatcher be tested
//! without a terminal.

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::QueueableCommand;
use std::io::{self, Write};

use crate::config::LoggerConfig;
use crate::event::{LogEvent, Severity};

/// A run of text sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            foreground: None,
            background: None,
        }
    }

    pub fn styled(text: impl Into<String>, foreground: Option<Color>, background: Option<Color>) -> Self {
        Self {
            text: text.into(),
            foreground,
            background,
        }
    }
}

/// One rendered console line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedLine {
    pub segments: Vec<Segment>,
}

impl RenderedLine {
    /// The line without styling
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Background/foreground used for a severity banner
pub fn severity_style(severity: Severity) -> (Color, Color) {
    match severity {
        Severity::Critical => (Color::White, Color::DarkRed),
        Severity::Warning => (Color::White, Color::DarkYellow),
        Severity::General | Severity::Debug => (Color::White, Color::DarkGrey),
    }
}

/// Build the console line for an event
///
/// An explicit color wins over the severity; without either the message is
/// printed as-is.
pub fn render_event(event: &LogEvent, config: &LoggerConfig) -> RenderedLine {
    let mut segments = Vec::with_capacity(3);

    if config.include_timestamp {
        segments.push(Segment::plain(format!(
            "{}: ",
            event.timestamp(&config.timestamp_format)
        )));
    }

    match (event.color, event.severity) {
        (Some(color), _) => {
            segments.push(Segment::styled(event.message.clone(), Some(color), None));
        }
        (None, Some(severity)) => {
            let (foreground, background) = severity_style(severity);
            segments.push(Segment::styled(
                severity.banner(),
                Some(foreground),
                Some(background),
            ));
            segments.push(Segment::plain(format!(" {}", event.message)));
        }
        (None, None) => segments.push(Segment::plain(event.message.clone())),
    }

    RenderedLine { segments }
}

/// Destination for rendered lines
pub trait ConsoleSink: Send {
    /// Write one line; styling must not leak past it
    fn write_line(&mut self, line: &RenderedLine) -> io::Result<()>;
}

/// ANSI terminal on stdout
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl ConsoleSink for TerminalConsole {
    fn write_line(&mut self, line: &RenderedLine) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write_styled(&mut out, line)
    }
}

/// Queue a line with crossterm commands and flush it
pub fn write_styled<W: Write>(out: &mut W, line: &RenderedLine) -> io::Result<()> {
    for segment in &line.segments {
        if let Some(color) = segment.foreground {
            out.queue(SetForegroundColor(color))?;
        }
        if let Some(color) = segment.background {
            out.queue(SetBackgroundColor(color))?;
        }
        out.queue(Print(&segment.text))?;
        if segment.foreground.is_some() || segment.background.is_some() {
            out.queue(ResetColor)?;
        }
    }
    out.queue(ResetColor)?;
    out.queue(Print("\n"))?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn untimed() -> LoggerConfig {
        LoggerConfig {
            include_timestamp: false,
            ..LoggerConfig::default()
        }
    }

    #[test]
    fn test_plain_message() {
        let line = render_event(&LogEvent::new("hello"), &untimed());
        assert_eq!(line.segments, vec![Segment::plain("hello")]);
    }

    #[test]
    fn test_color_overrides_severity() {
        let event = LogEvent::new("hello")
            .with_severity(Severity::Critical)
            .with_color(Color::Green);
        let line = render_event(&event, &untimed());

        assert_eq!(line.segments.len(), 1);
        assert_eq!(line.segments[0].foreground, Some(Color::Green));
        assert_eq!(line.text(), "hello");
    }

    #[test]
    fn test_severity_banner() {
        let event = LogEvent::new("disk full").with_severity(Severity::Warning);
        let line = render_event(&event, &untimed());

        assert_eq!(line.text(), "‼ Warning ‼ disk full");
        assert_eq!(line.segments[0].background, Some(Color::DarkYellow));
        assert_eq!(line.segments[1].background, None);
    }

    #[test]
    fn test_timestamp_prefix() {
        let event = LogEvent::new("tick");
        let config = LoggerConfig {
            timestamp_format: "%H".to_string(),
            ..LoggerConfig::default()
        };
        let line = render_event(&event, &config);

        let expected = format!("{}: tick", event.created_at.format("%H"));
        assert_eq!(line.text(), expected);
    }

    #[test]
    fn test_write_styled_resets() {
        let event = LogEvent::new("boom").with_severity(Severity::Critical);
        let line = render_event(&event, &untimed());

        let mut out = Vec::new();
        write_styled(&mut out, &line).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("▲▲ Error ▲▲"));
        assert!(text.ends_with("\x1b[0m\n"));
    }
}
