use std::time::Duration;

use super::device::{AudioFrame, AudioStreamSource};

/// Initial capacity of the in-memory segment buffer.
const SEGMENT_BUFFER_CAPACITY: usize = 512 * 1024;

/// A finalized, time-bounded chunk of captured audio.
///
/// Immutable once constructed; ownership transfers to the sink on emit.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bits per sample (always 16 for PCM frames)
    pub bits_per_sample: u16,
    /// Number of channels
    pub channels: u16,
    /// Which stream the audio came from
    pub source: AudioStreamSource,
    /// Seconds since the session clock started, measured at the segment start
    pub offset_seconds: f32,
    /// Little-endian 16-bit PCM
    pub payload: Vec<u8>,
}

impl AudioSegment {
    /// Number of interleaved samples in the payload.
    pub fn sample_count(&self) -> usize {
        self.payload.len() / 2
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Accumulates frames into segments and rotates on a duration threshold.
///
/// Rotation is driven by frame timestamps rather than wall-clock reads, so a
/// frame is always appended whole to exactly one segment.
pub struct Segmenter {
    threshold_ms: u64,
    base_offset_seconds: f32,
    buffer: Vec<u8>,
    start_ms: Option<u64>,
    sample_rate: u32,
    channels: u16,
    source: AudioStreamSource,
}

impl Segmenter {
    /// `base_offset_seconds` is the session clock reading at capture start;
    /// it anchors `offset_seconds` across capture restarts within a session.
    pub fn new(threshold: Duration, base_offset_seconds: f32) -> Self {
        Self {
            threshold_ms: threshold.as_millis() as u64,
            base_offset_seconds,
            buffer: Vec::with_capacity(SEGMENT_BUFFER_CAPACITY),
            start_ms: None,
            sample_rate: 0,
            channels: 0,
            source: AudioStreamSource::Microphone,
        }
    }

    /// Append one frame to the current segment.
    ///
    /// If the frame's timestamp shows the rotation threshold has elapsed, the
    /// current segment is finalized and returned and the frame starts a fresh
    /// one.
    ///
    /// All frames within one segment must share a format: a device never
    /// changes sample rate, channel count, or source mid-stream. The segment
    /// is labeled with the format of its first frame.
    pub fn push(&mut self, frame: &AudioFrame) -> Option<AudioSegment> {
        let rotated = match self.start_ms {
            Some(start) if frame.timestamp_ms.saturating_sub(start) >= self.threshold_ms => {
                self.take_segment()
            }
            _ => None,
        };

        if self.start_ms.is_none() {
            self.start_ms = Some(frame.timestamp_ms);
            self.sample_rate = frame.sample_rate;
            self.channels = frame.channels;
            self.source = frame.source;
        } else {
            debug_assert!(
                frame.sample_rate == self.sample_rate
                    && frame.channels == self.channels
                    && frame.source == self.source,
                "frame format changed mid-segment: {}Hz/{}ch -> {}Hz/{}ch",
                self.sample_rate,
                self.channels,
                frame.sample_rate,
                frame.channels,
            );
        }

        self.buffer.reserve(frame.samples.len() * 2);
        for &sample in &frame.samples {
            self.buffer.extend_from_slice(&sample.to_le_bytes());
        }

        rotated
    }

    /// Finalize the in-flight segment, if any frames were written.
    ///
    /// Called on loop exit so stopping never drops buffered audio.
    pub fn finish(mut self) -> Option<AudioSegment> {
        self.take_segment()
    }

    fn take_segment(&mut self) -> Option<AudioSegment> {
        let start_ms = self.start_ms.take()?;
        if self.buffer.is_empty() {
            return None;
        }

        let payload = std::mem::replace(&mut self.buffer, Vec::with_capacity(SEGMENT_BUFFER_CAPACITY));

        Some(AudioSegment {
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            channels: self.channels,
            source: self.source,
            offset_seconds: self.base_offset_seconds + start_ms as f32 / 1000.0,
            payload,
        })
    }
}
