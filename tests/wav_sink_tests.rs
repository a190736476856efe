// Tests for the WAV segment sink.

use segcap::{AudioSegment, AudioStreamSource, SegmentSink, WavSink};
use tempfile::TempDir;

fn pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn segment(offset_seconds: f32, samples: &[i16]) -> AudioSegment {
    AudioSegment {
        sample_rate: 16000,
        bits_per_sample: 16,
        channels: 1,
        source: AudioStreamSource::Microphone,
        offset_seconds,
        payload: pcm(samples),
    }
}

#[test]
fn segments_are_written_as_numbered_wav_files() {
    let dir = TempDir::new().unwrap();
    let sink = WavSink::new("test-session", dir.path()).unwrap();

    sink.emit(segment(0.0, &[1, 2, 3, 4])).unwrap();
    sink.emit(segment(15.0, &[5, 6])).unwrap();

    let first = dir.path().join("test-session-segment-000.wav");
    let second = dir.path().join("test-session-segment-001.wav");
    assert!(first.exists());
    assert!(second.exists());

    let reader = hound::WavReader::open(&first).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let samples: Vec<i16> = reader.into_samples::<i16>().map(Result::unwrap).collect();
    assert_eq!(samples, vec![1, 2, 3, 4]);

    let samples: Vec<i16> = hound::WavReader::open(&second)
        .unwrap()
        .into_samples::<i16>()
        .map(Result::unwrap)
        .collect();
    assert_eq!(samples, vec![5, 6]);
}

#[test]
fn sink_creates_missing_output_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b/segments");

    let sink = WavSink::new("s", &nested).unwrap();
    sink.emit(segment(0.0, &[9])).unwrap();

    assert!(nested.join("s-segment-000.wav").exists());
}

#[test]
fn segment_helpers_report_duration() {
    let seg = segment(0.0, &vec![0i16; 16000]);
    assert_eq!(seg.sample_count(), 16000);
    assert!((seg.duration_seconds() - 1.0).abs() < 0.001);
}
