//! Audio output devices and blocking burst playback
//!
//! [`AudioOutput`] is acquired once per tracker (or per beep) and hands out a
//! [`TonePlayer`] that plays whole bursts synchronously. The cpal
//! implementation builds a short-lived output stream per burst; streams are
//! not `Send` on every platform, so they never leave the playing thread.
//!
//! Devices dictate their own rate and sample format. Callers render bursts at
//! [`TonePlayer::sample_rate`] when it is set.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::audio::tone::ToneBurst;
use crate::error::AudioError;

/// Plays rendered bursts to completion
pub trait TonePlayer: Send {
    /// Block until `burst` has been played
    fn play(&mut self, burst: &ToneBurst) -> Result<(), AudioError>;

    /// Rate bursts must be rendered at; `None` accepts any rate
    fn sample_rate(&self) -> Option<u32> {
        None
    }
}

/// Source of tone players
pub trait AudioOutput: Send + Sync {
    /// Acquire a player; fails when no usable device is available
    fn open(&self) -> Result<Box<dyn TonePlayer>, AudioError>;
}

/// Output device description
#[derive(Debug, Clone, Serialize)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// List all available output devices
pub fn list_output_devices() -> Vec<OutputDeviceInfo> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                let is_default = default_name.as_ref() == Some(&name);
                let (sample_rates, channels) = get_device_capabilities(&device);

                devices.push(OutputDeviceInfo {
                    name,
                    is_default,
                    sample_rates,
                    channels,
                });
            }
        }
    }

    devices
}

/// Sample rates and channel counts an output device supports
fn get_device_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_output_configs() {
        for config in configs {
            for rate_val in [22050u32, 44100, 48000, 88200, 96000] {
                let rate = cpal::SampleRate(rate_val);
                if rate >= config.min_sample_rate()
                    && rate <= config.max_sample_rate()
                    && !sample_rates.contains(&rate_val)
                {
                    sample_rates.push(rate_val);
                }
            }

            let ch = config.channels();
            if !channels.contains(&ch) {
                channels.push(ch);
            }
        }
    }

    sample_rates.sort();
    channels.sort();

    (sample_rates, channels)
}

/// Get an output device by name
pub fn get_output_device(name: &str) -> Result<cpal::Device, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().is_ok_and(|device_name| device_name == name) {
            return Ok(device);
        }
    }

    Err(AudioError::DeviceNotFound(name.to_string()))
}

/// Get default output device
pub fn get_default_output_device() -> Result<cpal::Device, AudioError> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))
}

/// Output through cpal
#[derive(Debug, Clone, Default)]
pub struct CpalOutput {
    /// Device name; `None` uses the host default
    device_name: Option<String>,
}

impl CpalOutput {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    pub fn default_device() -> Self {
        Self::default()
    }
}

impl AudioOutput for CpalOutput {
    fn open(&self) -> Result<Box<dyn TonePlayer>, AudioError> {
        let device = match &self.device_name {
            Some(name) => get_output_device(name)?,
            None => get_default_output_device()?,
        };

        let default_config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

        if default_config.channels() == 0 {
            return Err(AudioError::UnsupportedFormat("device has no channels".to_string()));
        }
        let sample_format = supported_sample_format(default_config.sample_format())?;

        tracing::debug!(
            "Output device ready: {} Hz, {} channel(s), {:?}",
            default_config.sample_rate().0,
            default_config.channels(),
            sample_format
        );

        Ok(Box::new(CpalPlayer {
            device,
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate().0,
            sample_format,
        }))
    }
}

/// Sample formats the player can write
pub fn supported_sample_format(format: SampleFormat) -> Result<SampleFormat, AudioError> {
    match format {
        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16 => Ok(format),
        other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
    }
}

enum PlaybackEvent {
    /// Last sample handed to the device; `tail` is the length of that final buffer
    Finished { tail: Duration },
    Failed(String),
}

/// Player bound to one cpal device, at the device's default config
pub struct CpalPlayer {
    device: cpal::Device,
    channels: u16,
    sample_rate: u32,
    sample_format: SampleFormat,
}

impl CpalPlayer {
    fn play_as<T>(&self, burst: &ToneBurst) -> Result<(), AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let config = StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let samples: Arc<[f32]> = burst.samples.clone().into();
        let channels = self.channels as usize;
        let sample_rate = self.sample_rate as f64;
        let (event_tx, event_rx) = bounded::<PlaybackEvent>(2);
        let error_tx = event_tx.clone();

        let mut cursor = 0usize;
        let mut finished = false;

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Mono burst duplicated across every device channel
                    for frame in data.chunks_mut(channels) {
                        let value = samples.get(cursor).copied().unwrap_or(0.0);
                        cursor += 1;
                        frame.fill(T::from_sample(value));
                    }

                    if !finished && cursor >= samples.len() {
                        finished = true;
                        let frames = data.len() / channels;
                        let tail = Duration::from_secs_f64(frames as f64 / sample_rate);
                        let _ = event_tx.try_send(PlaybackEvent::Finished { tail });
                    }
                },
                move |err| {
                    let _ = error_tx.try_send(PlaybackEvent::Failed(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        match event_rx.recv() {
            Ok(PlaybackEvent::Finished { tail }) => {
                // Let the device drain its last buffer before the stream is dropped
                thread::sleep(tail);
                Ok(())
            }
            Ok(PlaybackEvent::Failed(msg)) => Err(AudioError::PlaybackFailed(msg)),
            Err(_) => Err(AudioError::PlaybackFailed("stream closed".to_string())),
        }
    }
}

impl TonePlayer for CpalPlayer {
    fn play(&mut self, burst: &ToneBurst) -> Result<(), AudioError> {
        if burst.is_empty() {
            return Ok(());
        }
        if burst.sample_rate != self.sample_rate {
            return Err(AudioError::UnsupportedFormat(format!(
                "burst at {} Hz, device at {} Hz",
                burst.sample_rate, self.sample_rate
            )));
        }

        match self.sample_format {
            SampleFormat::F32 => self.play_as::<f32>(burst),
            SampleFormat::I16 => self.play_as::<i16>(burst),
            SampleFormat::U16 => self.play_as::<u16>(burst),
            other => Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }
    }

    fn sample_rate(&self) -> Option<u32> {
        Some(self.sample_rate)
    }
}

/// Output that plays nothing but takes as long as real playback
///
/// Useful on machines without an audio device.
#[derive(Debug, Clone, Default)]
pub struct SilentOutput;

impl AudioOutput for SilentOutput {
    fn open(&self) -> Result<Box<dyn TonePlayer>, AudioError> {
        Ok(Box::new(SilentOutput))
    }
}

impl TonePlayer for SilentOutput {
    fn play(&mut self, burst: &ToneBurst) -> Result<(), AudioError> {
        thread::sleep(burst.duration());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::{samples_for, SignalGenerator, Waveform};
    use std::time::Instant;

    #[test]
    fn test_silent_output_takes_burst_duration() {
        let mut generator = SignalGenerator::new(Waveform::Sine, 700.0, 0.9, 44_100);
        let burst = generator.burst(samples_for(Duration::from_millis(30), 44_100), 1.0);

        let mut player = SilentOutput.open().unwrap();
        let start = Instant::now();
        player.play(&burst).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_supported_sample_formats() {
        assert!(supported_sample_format(SampleFormat::F32).is_ok());
        assert!(supported_sample_format(SampleFormat::I16).is_ok());
        assert!(supported_sample_format(SampleFormat::U16).is_ok());
        assert!(matches!(
            supported_sample_format(SampleFormat::F64),
            Err(AudioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_device_listing() {
        // Only meaningful with audio hardware; must not panic without it
        for device in list_output_devices() {
            assert!(device.sample_rates.windows(2).all(|w| w[0] < w[1]));
            assert!(device.channels.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
