//! Tone catalog and waveform synthesis
//!
//! Bursts are rendered into memory up front and handed to the output as a
//! whole, so playback never waits on synthesis.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::time::Duration;

/// Solfège pitch of a queued beep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TonePitch {
    Do,
    Re,
    Mi,
    Fa,
    Sol,
    La,
    Ti,
}

impl TonePitch {
    pub const ALL: [TonePitch; 7] = [
        TonePitch::Do,
        TonePitch::Re,
        TonePitch::Mi,
        TonePitch::Fa,
        TonePitch::Sol,
        TonePitch::La,
        TonePitch::Ti,
    ];

    /// Frequency in Hz (C4 major scale, rounded)
    pub fn frequency_hz(self) -> f32 {
        match self {
            TonePitch::Do => 262.0,
            TonePitch::Re => 294.0,
            TonePitch::Mi => 330.0,
            TonePitch::Fa => 349.0,
            TonePitch::Sol => 392.0,
            TonePitch::La => 440.0,
            TonePitch::Ti => 494.0,
        }
    }
}

/// Length of a queued beep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneLength {
    ReallyBrief,
    Brief,
    ReallyShort,
    Short,
    Medium,
    Long,
    ReallyLong,
}

impl ToneLength {
    pub const ALL: [ToneLength; 7] = [
        ToneLength::ReallyBrief,
        ToneLength::Brief,
        ToneLength::ReallyShort,
        ToneLength::Short,
        ToneLength::Medium,
        ToneLength::Long,
        ToneLength::ReallyLong,
    ];

    pub fn millis(self) -> u64 {
        match self {
            ToneLength::ReallyBrief => 100,
            ToneLength::Brief => 250,
            ToneLength::ReallyShort => 500,
            ToneLength::Short => 750,
            ToneLength::Medium => 1000,
            ToneLength::Long => 1500,
            ToneLength::ReallyLong => 2000,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::from_millis(self.millis())
    }
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
}

/// Number of mono samples covering `duration`
pub fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64) as usize
}

/// Rendered mono audio ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBurst {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ToneBurst {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Phase-continuous oscillator
///
/// Consecutive reads pick up where the previous one stopped, so a tracker
/// playing back-to-back bursts does not click at the joins.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    waveform: Waveform,
    frequency: f64,
    gain: f32,
    sample_rate: u32,
    phase: f64,
}

impl SignalGenerator {
    pub fn new(waveform: Waveform, frequency: f32, gain: f32, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency: frequency as f64,
            gain,
            sample_rate,
            phase: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fill `buffer` with the next samples
    pub fn read(&mut self, buffer: &mut [f32]) {
        let step = self.frequency / self.sample_rate as f64;
        for sample in buffer.iter_mut() {
            let value = match self.waveform {
                Waveform::Sine => (TAU * self.phase).sin(),
                Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            };
            *sample = self.gain * value as f32;
            self.phase = (self.phase + step).fract();
        }
    }

    /// Render `len` samples scaled by `volume`
    pub fn burst(&mut self, len: usize, volume: f32) -> ToneBurst {
        let mut samples = vec![0.0f32; len];
        self.read(&mut samples);
        if volume != 1.0 {
            for sample in samples.iter_mut() {
                *sample *= volume;
            }
        }
        ToneBurst {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog() {
        assert_eq!(TonePitch::La.frequency_hz(), 440.0);
        assert_eq!(ToneLength::ReallyBrief.millis(), 100);
        assert_eq!(ToneLength::ReallyLong.duration(), Duration::from_secs(2));

        // Both scales ascend
        assert!(TonePitch::ALL.windows(2).all(|w| w[0].frequency_hz() < w[1].frequency_hz()));
        assert!(ToneLength::ALL.windows(2).all(|w| w[0].millis() < w[1].millis()));
    }

    #[test]
    fn test_burst_length() {
        let mut generator = SignalGenerator::new(Waveform::Sine, 700.0, 0.9, 44_100);
        let burst = generator.burst(samples_for(Duration::from_millis(50), 44_100), 1.0);

        assert_eq!(burst.samples.len(), 2205);
        assert_eq!(burst.duration(), Duration::from_millis(50));
        assert!(burst.peak() <= 0.9 + f32::EPSILON);
        assert!(burst.peak() > 0.85);
    }

    #[test]
    fn test_volume_scaling() {
        let mut generator = SignalGenerator::new(Waveform::Sine, 700.0, 0.9, 44_100);
        assert_eq!(generator.burst(1000, 0.0).peak(), 0.0);

        let half = generator.burst(1000, 0.5).peak();
        assert!(half > 0.4 && half <= 0.45 + f32::EPSILON);
    }

    #[test]
    fn test_sawtooth_range() {
        let mut generator = SignalGenerator::new(Waveform::Sawtooth, 8.0, 1.0, 1024);
        let burst = generator.burst(256, 1.0);

        assert_eq!(burst.samples[0], -1.0);
        assert!(burst.samples.iter().all(|s| (-1.0..1.0).contains(s)));
        // One period is 128 samples: ramp then wrap
        assert!(burst.samples[127] > 0.95);
        assert_eq!(burst.samples[128], -1.0);
    }

    #[test]
    fn test_phase_continuity() {
        let mut split = SignalGenerator::new(Waveform::Sine, 700.0, 1.0, 44_100);
        let mut whole = split.clone();

        let mut first = split.burst(300, 1.0).samples;
        first.extend(split.burst(300, 1.0).samples);
        let joined = whole.burst(600, 1.0).samples;

        for (a, b) in first.iter().zip(joined.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
