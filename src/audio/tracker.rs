//! Live value sonification
//!
//! A tracker watches a numeric cell owned by the host and plays a fixed tone
//! whose volume follows the cell's position inside `[lower, upper]`. Each
//! tracker runs its own render thread:
//!
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ sample cell  │ → │ value→volume │ → │ 50 ms burst  │ → │ play + 25 ms │ ─┐
//!   └──────────────┘   └──────────────┘   └──────────────┘   └──────────────┘  │
//!          ▲                                                                    │
//!          └────────────────────── until stop() ────────────────────────────────┘
//! ```
//!
//! The cell is shared through an `Arc`, so a tracker can never outlive the
//! value it reads, and every read is a single atomic load: the host keeps
//! writing without locks and the tracker never sees a torn value.

use crossbeam_channel::{bounded, Receiver};
use dashmap::DashMap;
use std::sync::atomic::{
    AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU16, AtomicU32, AtomicU64, AtomicUsize,
    Ordering,
};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

use crate::audio::output::{AudioOutput, TonePlayer};
use crate::audio::tone::{samples_for, SignalGenerator, Waveform};
use crate::config::TrackerConfig;
use crate::worker::RunFlag;

/// A numeric value a tracker can sample from another thread
pub trait Observable: Send + Sync {
    /// Current value
    fn sample(&self) -> f64;
}

/// `f32` stored as its bit pattern in an `AtomicU32`
#[derive(Debug, Default)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Apply `f` atomically, returning the previous value
    pub fn update(&self, mut f: impl FnMut(f32) -> f32) -> f32 {
        let previous = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(f(f32::from_bits(bits)).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f32::from_bits(previous)
    }
}

impl Observable for AtomicF32 {
    fn sample(&self) -> f64 {
        self.load() as f64
    }
}

/// `f64` stored as its bit pattern in an `AtomicU64`
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Apply `f` atomically, returning the previous value
    pub fn update(&self, mut f: impl FnMut(f64) -> f64) -> f64 {
        let previous = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(f(f64::from_bits(bits)).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous)
    }
}

impl Observable for AtomicF64 {
    fn sample(&self) -> f64 {
        self.load()
    }
}

macro_rules! impl_observable_int {
    ($($atomic:ty),* $(,)?) => {
        $(
            impl Observable for $atomic {
                fn sample(&self) -> f64 {
                    self.load(Ordering::Relaxed) as f64
                }
            }
        )*
    };
}

impl_observable_int!(
    AtomicI16,
    AtomicU16,
    AtomicI32,
    AtomicU32,
    AtomicI64,
    AtomicU64,
    AtomicIsize,
    AtomicUsize,
);

/// Playback volume for `value` inside `[lower, upper]`
///
/// Linear in the value, clamped to `0.0..=1.0`. `lower < upper` is assumed;
/// a NaN ratio maps to silence.
pub fn volume_for(value: f64, lower: f64, upper: f64) -> f32 {
    let ratio = (value - lower) / (upper - lower);
    if ratio.is_nan() {
        return 0.0;
    }
    let percentage = (ratio * 100.0).clamp(0.0, 100.0);
    (percentage / 100.0) as f32
}

/// State shared between a tracker's thread, its handle and the registry
#[derive(Debug)]
struct TrackerShared {
    id: Uuid,
    lower: f64,
    upper: f64,
    running: RunFlag,
    last_volume: AtomicF32,
    cycles: AtomicU64,
}

/// Registered tracker; `done` disconnects when its thread exits
struct TrackerEntry {
    shared: Arc<TrackerShared>,
    done: Receiver<()>,
}

/// Every live tracker, for bulk shutdown
#[derive(Default)]
pub struct TrackerRegistry {
    trackers: DashMap<Uuid, TrackerEntry>,
}

impl TrackerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `cell`
    ///
    /// The output is opened on the calling thread; when that fails, or the
    /// render thread cannot be spawned, the failure is logged and `None` is
    /// returned.
    pub fn start(
        self: &Arc<Self>,
        cell: Arc<dyn Observable>,
        lower: f64,
        upper: f64,
        output: &dyn AudioOutput,
        settings: &TrackerConfig,
    ) -> Option<TrackerHandle> {
        let player = match output.open() {
            Ok(player) => player,
            Err(e) => {
                tracing::warn!("Cannot track value: {}", e);
                return None;
            }
        };

        let shared = Arc::new(TrackerShared {
            id: Uuid::new_v4(),
            lower,
            upper,
            running: RunFlag::new(),
            last_volume: AtomicF32::new(0.0),
            cycles: AtomicU64::new(0),
        });
        let (done_tx, done_rx) = bounded::<()>(0);

        // Registered before the thread starts so a fast exit can't race the insert
        self.trackers.insert(
            shared.id,
            TrackerEntry {
                shared: shared.clone(),
                done: done_rx.clone(),
            },
        );

        let registry = self.clone();
        let shared_for_loop = shared.clone();
        let settings = settings.clone();
        let spawned = thread::Builder::new()
            .name(format!("tracker-{}", &shared.id.simple().to_string()[..8]))
            .spawn(move || {
                let _done = done_tx;
                run_tracker(&shared_for_loop, cell.as_ref(), player, &settings);
                registry.trackers.remove(&shared_for_loop.id);
            });

        if let Err(e) = spawned {
            tracing::warn!("Cannot spawn tracker thread: {}", e);
            self.trackers.remove(&shared.id);
            return None;
        }

        tracing::debug!("Tracker {} started for [{}, {}]", shared.id, lower, upper);
        Some(TrackerHandle {
            shared,
            done: done_rx,
        })
    }

    /// Number of trackers still running
    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.trackers.iter().map(|e| *e.key()).collect()
    }

    /// Stop every tracker and wait for their threads to finish
    pub fn stop_all(&self) -> usize {
        let entries: Vec<(Arc<TrackerShared>, Receiver<()>)> = self
            .trackers
            .iter()
            .map(|e| (e.shared.clone(), e.done.clone()))
            .collect();

        for (shared, _) in &entries {
            shared.running.stop();
        }
        for (_, done) in &entries {
            // Disconnects when the thread drops its sender
            let _ = done.recv();
        }

        if !entries.is_empty() {
            tracing::info!("Stopped {} tracker(s)", entries.len());
        }
        entries.len()
    }
}

fn run_tracker(
    shared: &TrackerShared,
    cell: &dyn Observable,
    mut player: Box<dyn TonePlayer>,
    settings: &TrackerConfig,
) {
    let sample_rate = player.sample_rate().unwrap_or(settings.sample_rate);
    let mut generator = SignalGenerator::new(
        Waveform::Sine,
        settings.frequency_hz,
        settings.gain,
        sample_rate,
    );
    let burst_len = samples_for(settings.burst(), sample_rate);
    let rest = settings.rest();
    let mut failures = 0u64;

    while shared.running.is_running() {
        let volume = volume_for(cell.sample(), shared.lower, shared.upper);
        shared.last_volume.store(volume);

        let burst = generator.burst(burst_len, volume);
        if let Err(e) = player.play(&burst) {
            failures += 1;
            if failures == 1 {
                tracing::warn!("Tracker {} playback failed: {}", shared.id, e);
            } else {
                tracing::debug!("Tracker {} playback failed ({} times): {}", shared.id, failures, e);
            }
        }
        shared.cycles.fetch_add(1, Ordering::Relaxed);

        thread::sleep(rest);
    }

    tracing::debug!("Tracker {} stopped", shared.id);
}

/// Handle to a running tracker
///
/// Dropping the handle does not stop the tracker; it keeps playing until
/// [`TrackerHandle::stop`] or until the owning diagnostics shut down.
#[must_use = "a tracker keeps playing until stop() or shutdown"]
pub struct TrackerHandle {
    shared: Arc<TrackerShared>,
    done: Receiver<()>,
}

impl TrackerHandle {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.shared.lower, self.shared.upper)
    }

    /// Ask the render loop to exit after its current cycle
    pub fn stop(&self) {
        self.shared.running.stop();
    }

    /// Stop and wait for the render thread to finish
    pub fn wait(self) {
        self.stop();
        let _ = self.done.recv();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.is_running()
    }

    /// Volume of the most recent burst
    pub fn last_volume(&self) -> f32 {
        self.shared.last_volume.load()
    }

    /// Bursts rendered so far
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TrackerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerHandle")
            .field("id", &self.shared.id)
            .field("lower", &self.shared.lower)
            .field("upper", &self.shared.upper)
            .field("running", &self.is_running())
            .finish()
    }
}
