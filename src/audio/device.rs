use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Audio stream source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioStreamSource {
    /// Microphone input
    Microphone,
    /// System audio (applications, browser, etc.)
    System,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the device was opened
    pub timestamp_ms: u64,
    /// Audio stream source (microphone or system)
    pub source: AudioStreamSource,
}

/// Requested capture format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency and stop responsiveness)
    pub frame_duration_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_duration_ms: 100,
        }
    }
}

impl DeviceConfig {
    /// Number of interleaved samples in one full frame.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms / 1000) as usize * self.channels as usize
    }
}

/// A source of fixed-duration PCM frames.
///
/// The capture worker owns the device for the lifetime of one capture run
/// and drops it on exit, so stopping (or muting) always releases the
/// underlying resource.
pub trait CaptureDevice: Send {
    /// Read the next frame.
    ///
    /// `Ok(None)` means the stream ended. `Err` is a transient read failure;
    /// the caller is expected to log it and keep reading.
    fn next_frame(&mut self) -> Result<Option<AudioFrame>>;
}

/// Opens capture devices.
///
/// A fresh device is opened on every capture start. Open failure means no
/// compatible device/format was found; the controller logs it and leaves
/// recording off until the next start attempt.
pub trait CaptureDeviceFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn CaptureDevice>>;

    /// Factory name for logging
    fn name(&self) -> &str;
}
