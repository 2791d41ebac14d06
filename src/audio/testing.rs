//! Recording audio output
//!
//! Stands in for a sound card in tests: every burst is recorded with its
//! peak level and the time it started and finished playing.
//! Hidden from the docs; not part of the supported API.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::output::{AudioOutput, TonePlayer};
use crate::audio::tone::ToneBurst;
use crate::error::AudioError;

/// One recorded burst
#[derive(Debug, Clone)]
pub struct PlayRecord {
    pub peak: f32,
    pub sample_rate: u32,
    pub duration: Duration,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Debug, Default)]
struct Recorder {
    plays: Mutex<Vec<PlayRecord>>,
    opens: AtomicUsize,
    rejected: AtomicUsize,
    fail_open: bool,
    realtime: bool,
    device_rate: Option<u32>,
}

/// Output that records instead of playing
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    recorder: Arc<Recorder>,
}

impl RecordingOutput {
    /// Records and returns immediately
    pub fn instant() -> Self {
        Self::default()
    }

    /// Records and blocks for the burst's duration, like a real device
    pub fn realtime() -> Self {
        Self {
            recorder: Arc::new(Recorder {
                realtime: true,
                ..Recorder::default()
            }),
        }
    }

    /// Every `open` fails as if no device were present
    pub fn failing() -> Self {
        Self {
            recorder: Arc::new(Recorder {
                fail_open: true,
                ..Recorder::default()
            }),
        }
    }

    /// Accepts only bursts rendered at `rate`, like a device with a fixed mix rate
    pub fn with_device_rate(rate: u32) -> Self {
        Self {
            recorder: Arc::new(Recorder {
                device_rate: Some(rate),
                ..Recorder::default()
            }),
        }
    }

    pub fn plays(&self) -> Vec<PlayRecord> {
        self.recorder.plays.lock().clone()
    }

    pub fn play_count(&self) -> usize {
        self.recorder.plays.lock().len()
    }

    pub fn last_peak(&self) -> Option<f32> {
        self.recorder.plays.lock().last().map(|p| p.peak)
    }

    pub fn open_attempts(&self) -> usize {
        self.recorder.opens.load(Ordering::Relaxed)
    }

    /// Bursts refused for being at the wrong rate
    pub fn rejected(&self) -> usize {
        self.recorder.rejected.load(Ordering::Relaxed)
    }

    /// Poll until at least `count` bursts finished or `timeout` passes
    pub fn wait_for_plays(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.play_count() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        self.play_count() >= count
    }
}

impl AudioOutput for RecordingOutput {
    fn open(&self) -> Result<Box<dyn TonePlayer>, AudioError> {
        self.recorder.opens.fetch_add(1, Ordering::Relaxed);
        if self.recorder.fail_open {
            return Err(AudioError::DeviceNotFound("recording output set to fail".to_string()));
        }
        Ok(Box::new(RecordingPlayer {
            recorder: self.recorder.clone(),
        }))
    }
}

struct RecordingPlayer {
    recorder: Arc<Recorder>,
}

impl TonePlayer for RecordingPlayer {
    fn play(&mut self, burst: &ToneBurst) -> Result<(), AudioError> {
        if let Some(rate) = self.recorder.device_rate {
            if burst.sample_rate != rate {
                self.recorder.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(AudioError::UnsupportedFormat(format!(
                    "burst at {} Hz, device at {} Hz",
                    burst.sample_rate, rate
                )));
            }
        }

        let started = Instant::now();
        if self.recorder.realtime {
            thread::sleep(burst.duration());
        }
        self.recorder.plays.lock().push(PlayRecord {
            peak: burst.peak(),
            sample_rate: burst.sample_rate,
            duration: burst.duration(),
            started,
            finished: Instant::now(),
        });
        Ok(())
    }

    fn sample_rate(&self) -> Option<u32> {
        self.recorder.device_rate
    }
}
