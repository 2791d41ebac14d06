//! Host alert sounds
//!
//! Short native beeps played when a message with a severity is rendered.
//! Independent of the queued tone subsystem.

use crate::event::Severity;

/// Alert flavour, mirroring the host's message-beep styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    General,
    Warning,
    Error,
}

impl AlertKind {
    /// Alert for a severity; `Debug` is silent
    pub fn for_severity(severity: Severity) -> Option<Self> {
        match severity {
            Severity::General => Some(AlertKind::General),
            Severity::Warning => Some(AlertKind::Warning),
            Severity::Critical => Some(AlertKind::Error),
            Severity::Debug => None,
        }
    }
}

/// Something that can make the host beep
pub trait SystemAlert: Send {
    fn alert(&mut self, kind: AlertKind);
}

/// Native short beep
///
/// Uses `MessageBeep` on Windows and the terminal bell elsewhere.
#[derive(Debug, Default)]
pub struct SystemBell;

impl SystemAlert for SystemBell {
    fn alert(&mut self, kind: AlertKind) {
        platform_beep(kind);
    }
}

#[cfg(target_os = "windows")]
fn platform_beep(kind: AlertKind) {
    use windows::Win32::UI::WindowsAndMessaging::{MessageBeep, MB_ICONERROR, MB_ICONWARNING};

    let style = match kind {
        AlertKind::Warning => MB_ICONWARNING,
        AlertKind::General | AlertKind::Error => MB_ICONERROR,
    };
    // SAFETY: MessageBeep takes a plain flag value and has no memory preconditions
    let _ = unsafe { MessageBeep(style) };
}

#[cfg(not(target_os = "windows"))]
fn platform_beep(_kind: AlertKind) {
    use std::io::Write;

    let mut out = std::io::stderr();
    if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
        tracing::debug!("Terminal bell failed: {}", e);
    }
}

/// Alert that does nothing
#[derive(Debug, Default)]
pub struct NoAlert;

impl SystemAlert for NoAlert {
    fn alert(&mut self, _kind: AlertKind) {}
}
