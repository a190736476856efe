use anyhow::{bail, Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use tracing::info;

use super::device::{AudioFrame, AudioStreamSource, CaptureDevice, CaptureDeviceFactory, DeviceConfig};

/// Capture device backed by a WAV file.
///
/// Delivers the file's samples as fixed-duration frames with timestamps
/// derived from the sample position, so segment rotation behaves exactly as
/// it would against a live device.
pub struct WavCaptureDevice {
    samples: Vec<i16>,
    position: usize,
    sample_rate: u32,
    channels: u16,
    samples_per_frame: usize,
    source: AudioStreamSource,
}

impl WavCaptureDevice {
    pub fn open(path: impl AsRef<Path>, frame_duration_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening capture file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            bail!(
                "Unsupported capture format: expected 16-bit integer PCM, got {}-bit {:?}",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        // Frame size follows the file's format, not the configured one.
        let format = DeviceConfig {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frame_duration_ms,
        };
        let samples_per_frame = format.samples_per_frame();
        if samples_per_frame == 0 {
            bail!("Frame duration {}ms is too short for this file", frame_duration_ms);
        }

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);
        info!(
            "Capture file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            samples,
            position: 0,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples_per_frame,
            source: AudioStreamSource::Microphone,
        })
    }
}

impl CaptureDevice for WavCaptureDevice {
    fn next_frame(&mut self) -> Result<Option<AudioFrame>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }

        let end = (self.position + self.samples_per_frame).min(self.samples.len());
        let timestamp_ms =
            self.position as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64);
        let samples = self.samples[self.position..end].to_vec();
        self.position = end;

        Ok(Some(AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
            source: self.source,
        }))
    }
}

/// Factory that reopens the same WAV file on every capture start.
pub struct WavFileFactory {
    path: PathBuf,
    frame_duration_ms: u64,
}

impl WavFileFactory {
    pub fn new(path: impl Into<PathBuf>, config: &DeviceConfig) -> Self {
        Self {
            path: path.into(),
            frame_duration_ms: config.frame_duration_ms,
        }
    }
}

impl CaptureDeviceFactory for WavFileFactory {
    fn open(&self) -> Result<Box<dyn CaptureDevice>> {
        Ok(Box::new(WavCaptureDevice::open(&self.path, self.frame_duration_ms)?))
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
