use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use super::SegmentSink;
use crate::audio::AudioSegment;

/// Writes each segment as a numbered WAV file under an output directory.
pub struct WavSink {
    output_dir: PathBuf,
    session_id: String,
    next_index: AtomicUsize,
}

impl WavSink {
    pub fn new(session_id: impl Into<String>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        let session_id = session_id.into();
        info!(
            "WAV sink initialized: {} -> {}",
            session_id,
            output_dir.display()
        );

        Ok(Self {
            output_dir,
            session_id,
            next_index: AtomicUsize::new(0),
        })
    }
}

impl SegmentSink for WavSink {
    fn emit(&self, segment: AudioSegment) -> Result<()> {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let path = self
            .output_dir
            .join(format!("{}-segment-{:03}.wav", self.session_id, index));

        let spec = hound::WavSpec {
            channels: segment.channels,
            sample_rate: segment.sample_rate,
            bits_per_sample: segment.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        for bytes in segment.payload.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))
                .context("Failed to write sample to WAV")?;
        }

        writer.finalize().context("Failed to finalize WAV file")?;

        info!(
            "Segment {} written: {} ({:.1}s at offset {:.1}s)",
            index,
            path.display(),
            segment.duration_seconds(),
            segment.offset_seconds
        );

        Ok(())
    }
}
