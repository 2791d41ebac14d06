//! Audio subsystem module

pub mod beep;
pub mod output;
#[doc(hidden)]
pub mod testing;
pub mod tone;
pub mod tracker;

pub use beep::{BeepPlayer, ToneRequest};
pub use output::{list_output_devices, AudioOutput, CpalOutput, OutputDeviceInfo, SilentOutput, TonePlayer};
pub use tone::{SignalGenerator, ToneBurst, ToneLength, TonePitch, Waveform};
pub use tracker::{volume_for, AtomicF32, AtomicF64, Observable, TrackerHandle, TrackerRegistry};
