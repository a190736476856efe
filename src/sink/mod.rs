pub mod nats;
pub mod wav;

pub use nats::{NatsSink, SegmentMessage};
pub use wav::WavSink;

use anyhow::Result;

use crate::audio::AudioSegment;

/// External consumer of finished audio segments.
///
/// `emit` is fire-and-forget from the capture loop's perspective: the loop
/// logs a failure and keeps recording.
pub trait SegmentSink: Send + Sync {
    fn emit(&self, segment: AudioSegment) -> Result<()>;
}
