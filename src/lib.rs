//! # Console Debugger
//!
//! In-process developer diagnostics for a running application: queued debug
//! messages rendered to the console and/or appended to a log file, audible
//! beeps, and continuous sonification of a live numeric value.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────── HOST APPLICATION ───────────────────────────────┐
//! │   message() / colored() / with_severity()   request_beep()   start_tracking()   │
//! └────────────┬──────────────────────────────────────┬─────────────────┬───────────┘
//!              │ enqueue (never blocks)               │ enqueue         │ spawn
//!              ▼                                      ▼                 ▼
//!   ┌─────────────────────┐                ┌──────────────────┐  ┌──────────────────┐
//!   │  Event Queue        │                │  Beep Queue      │  │ Tracker thread   │
//!   │  (SegQueue)         │                │  (SegQueue)      │  │  (one per value) │
//!   └─────────┬───────────┘                └────────┬─────────┘  │ sample → volume  │
//!             ▼                                     ▼            │ → 700 Hz burst   │
//!   ┌─────────────────────┐                ┌──────────────────┐  └────────┬─────────┘
//!   │ Dispatcher thread   │──── clone ───┐ │ Beep thread      │           │
//!   │ category filter     │              │ │ sawtooth burst   │           │
//!   │ console + alert     │              │ └────────┬─────────┘           │
//!   └─────────┬───────────┘              ▼          │                     │
//!             │                ┌──────────────────┐ │                     │
//!             ▼                │ Log Sink thread  │ ▼                     ▼
//!      ┌────────────┐          │ CSV / plain text │ ┌─────────────────────────────┐
//!      │  Terminal  │          └────────┬─────────┘ │   Audio output (cpal)       │
//!      └────────────┘                   ▼           └─────────────────────────────┘
//!                               log.csv / log.txt
//! ```
//!
//! Everything is owned by a [`Diagnostics`] handle. Dropping it (or calling
//! [`Diagnostics::shutdown`]) stops every tracker and background thread.

pub mod alert;
pub mod audio;
pub mod category;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod queue;
pub mod sink;
pub mod worker;

pub use audio::{
    AtomicF32, AtomicF64, Observable, ToneLength, TonePitch, TrackerHandle,
};
pub use config::{DiagnosticsConfig, LogStyle, LoggerConfig, TrackerConfig};
pub use crossterm::style::Color;
pub use diagnostics::{Diagnostics, DiagnosticsBuilder};
pub use error::{Error, Result};
pub use event::{LogEvent, Severity};

/// Crate-wide constants
pub mod constants {
    /// Category every event belongs to unless told otherwise
    pub const DEFAULT_CATEGORY: &str = "General";

    /// Sample rate of every synthesized tone
    pub const TONE_SAMPLE_RATE: u32 = 44_100;

    /// Idle poll interval of the message dispatcher
    pub const DISPATCH_POLL_MS: u64 = 5;

    /// Idle poll interval of the log sink
    pub const LOG_SINK_POLL_MS: u64 = 5;

    /// Idle poll interval of the beep player
    pub const BEEP_POLL_MS: u64 = 10;

    /// Tracker tone frequency
    pub const TRACKER_FREQUENCY_HZ: f32 = 700.0;

    /// Tracker tone gain before volume scaling
    pub const TRACKER_GAIN: f32 = 0.9;

    /// Length of one tracker burst
    pub const TRACKER_BURST_MS: u64 = 50;

    /// Pause between tracker bursts
    pub const TRACKER_REST_MS: u64 = 25;

    /// Gain of queued beeps
    pub const BEEP_GAIN: f32 = 1.0;

    /// Timestamp format used on the console and in the log file
    pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
}
