//! Queued beeps
//!
//! Requests are played one at a time, each to completion, so a burst of
//! requests comes out back-to-back instead of overlapping.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::output::AudioOutput;
use crate::audio::tone::{samples_for, SignalGenerator, ToneBurst, ToneLength, TonePitch, Waveform};
use crate::constants::{BEEP_GAIN, BEEP_POLL_MS, TONE_SAMPLE_RATE};
use crate::error::Error;
use crate::queue::{create_shared_queue, SharedQueue};
use crate::worker::Worker;

/// One queued beep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneRequest {
    pub pitch: TonePitch,
    pub length: ToneLength,
}

impl ToneRequest {
    pub fn new(pitch: TonePitch, length: ToneLength) -> Self {
        Self { pitch, length }
    }

    /// Sawtooth burst at the catalog frequency and length
    pub fn render(&self) -> ToneBurst {
        self.render_at(TONE_SAMPLE_RATE)
    }

    pub fn render_at(&self, sample_rate: u32) -> ToneBurst {
        let mut generator = SignalGenerator::new(
            Waveform::Sawtooth,
            self.pitch.frequency_hz(),
            BEEP_GAIN,
            sample_rate,
        );
        generator.burst(samples_for(self.length.duration(), sample_rate), 1.0)
    }
}

/// Beep queue and its playback thread
pub struct BeepPlayer {
    queue: SharedQueue<ToneRequest>,
    worker: Mutex<Option<Worker>>,
}

impl BeepPlayer {
    /// Start the playback thread
    pub fn start(output: Arc<dyn AudioOutput>) -> Result<Self, Error> {
        let queue = create_shared_queue::<ToneRequest>();
        let queue_for_loop = queue.clone();

        let worker = Worker::spawn_polling("beep-player", Duration::from_millis(BEEP_POLL_MS), move || {
            let Some(request) = queue_for_loop.pop() else {
                return false;
            };
            play_request(output.as_ref(), request);
            true
        })?;

        Ok(Self {
            queue,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a beep; never blocks
    pub fn request(&self, pitch: TonePitch, length: ToneLength) {
        self.queue.push(ToneRequest::new(pitch, length));
    }

    /// Requests not yet started
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().as_ref().is_some_and(Worker::is_running)
    }

    /// Stop after the beep currently playing; queued requests stay unplayed
    pub fn stop(&self) {
        if let Some(mut worker) = self.worker.lock().take() {
            worker.stop();
        }
    }
}

impl Drop for BeepPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn play_request(output: &dyn AudioOutput, request: ToneRequest) {
    let mut player = match output.open() {
        Ok(player) => player,
        Err(e) => {
            tracing::warn!("Dropping beep {:?}: {}", request, e);
            return;
        }
    };

    let burst = request.render_at(player.sample_rate().unwrap_or(TONE_SAMPLE_RATE));

    if let Err(e) = player.play(&burst) {
        tracing::warn!("Beep {:?} failed: {}", request, e);
    }
}
