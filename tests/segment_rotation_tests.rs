// Tests for time-based segment rotation.
//
// These verify that frames are accumulated into segments, that segments
// rotate on the duration threshold, and that stopping flushes the
// partially filled segment instead of dropping it.

use segcap::{AudioFrame, AudioStreamSource, Segmenter};
use std::time::Duration;

fn frame(timestamp_ms: u64, samples: Vec<i16>) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
        source: AudioStreamSource::Microphone,
    }
}

#[test]
fn thirty_three_seconds_yields_three_segments() {
    // 15s threshold, 100ms frames: two full windows plus a ~3s remainder.
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 0.0);
    let mut segments = Vec::new();

    for i in 0..330u64 {
        if let Some(segment) = segmenter.push(&frame(i * 100, vec![0i16; 1600])) {
            segments.push(segment);
        }
    }
    if let Some(segment) = segmenter.finish() {
        segments.push(segment);
    }

    assert_eq!(segments.len(), 3, "33s at 15s threshold should yield 3 segments");

    // 150 frames of 1600 samples, 2 bytes each, in the full windows.
    assert_eq!(segments[0].payload.len(), 150 * 1600 * 2);
    assert_eq!(segments[1].payload.len(), 150 * 1600 * 2);
    // 30 frames (~3s) in the remainder.
    assert_eq!(segments[2].payload.len(), 30 * 1600 * 2);

    assert!((segments[0].offset_seconds - 0.0).abs() < 0.001);
    assert!((segments[1].offset_seconds - 15.0).abs() < 0.001);
    assert!((segments[2].offset_seconds - 30.0).abs() < 0.001);
}

#[test]
fn offsets_include_base_and_are_monotonic() {
    // The session clock read 2.5s when capture started.
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 2.5);
    let mut segments = Vec::new();

    for i in 0..320u64 {
        if let Some(segment) = segmenter.push(&frame(i * 100, vec![0i16; 160])) {
            segments.push(segment);
        }
    }
    if let Some(segment) = segmenter.finish() {
        segments.push(segment);
    }

    assert_eq!(segments.len(), 3);
    assert!((segments[0].offset_seconds - 2.5).abs() < 0.001);
    assert!((segments[1].offset_seconds - 17.5).abs() < 0.001);
    assert!((segments[2].offset_seconds - 32.5).abs() < 0.001);

    for pair in segments.windows(2) {
        assert!(
            pair[0].offset_seconds <= pair[1].offset_seconds,
            "offsets must be monotonically non-decreasing"
        );
    }
}

#[test]
fn stop_flushes_partial_segment() {
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 0.0);

    for i in 0..10u64 {
        assert!(segmenter.push(&frame(i * 100, vec![7i16; 1600])).is_none());
    }

    let segment = segmenter.finish().expect("partial segment must be emitted");
    assert_eq!(segment.payload.len(), 10 * 1600 * 2);
    assert_eq!(segment.sample_count(), 10 * 1600);
    assert!((segment.offset_seconds - 0.0).abs() < 0.001);
    assert!((segment.duration_seconds() - 1.0).abs() < 0.001);
}

#[test]
fn finish_without_frames_emits_nothing() {
    let segmenter = Segmenter::new(Duration::from_secs(15), 0.0);
    assert!(segmenter.finish().is_none());
}

#[test]
fn payload_is_little_endian_pcm() {
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 0.0);
    assert!(segmenter.push(&frame(0, vec![0x0102, -2])).is_none());

    let segment = segmenter.finish().expect("segment");
    assert_eq!(segment.payload, vec![0x02, 0x01, 0xFE, 0xFF]);
    assert_eq!(segment.bits_per_sample, 16);
}

#[test]
fn frames_are_never_split_across_segments() {
    // The frame that crosses the threshold rotates the segment first, then
    // lands whole in the next one.
    let mut segmenter = Segmenter::new(Duration::from_secs(1), 0.0);

    assert!(segmenter.push(&frame(0, vec![1i16; 1600])).is_none());
    let first = segmenter
        .push(&frame(1000, vec![2i16; 1600]))
        .expect("threshold crossing should rotate");

    assert_eq!(first.payload.len(), 1600 * 2);
    assert!(first.payload.iter().step_by(2).all(|&b| b == 1));

    let second = segmenter.finish().expect("second segment");
    assert_eq!(second.payload.len(), 1600 * 2);
    assert!(second.payload.iter().step_by(2).all(|&b| b == 2));
    assert!((second.offset_seconds - 1.0).abs() < 0.001);
}

#[test]
#[should_panic(expected = "format changed mid-segment")]
fn mid_segment_format_change_is_rejected() {
    // Devices never change format mid-stream; a frame that disagrees with
    // the segment's latched format trips the debug assertion instead of
    // being silently mislabeled.
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 0.0);
    assert!(segmenter.push(&frame(0, vec![0i16; 1600])).is_none());

    let _ = segmenter.push(&AudioFrame {
        samples: vec![0i16; 1102],
        sample_rate: 11025,
        channels: 1,
        timestamp_ms: 100,
        source: AudioStreamSource::Microphone,
    });
}

#[test]
fn segment_format_follows_frames() {
    let mut segmenter = Segmenter::new(Duration::from_secs(15), 0.0);
    let rotated = segmenter.push(&AudioFrame {
        samples: vec![0i16; 1102],
        sample_rate: 11025,
        channels: 1,
        timestamp_ms: 0,
        source: AudioStreamSource::Microphone,
    });
    assert!(rotated.is_none());

    let segment = segmenter.finish().expect("segment");
    assert_eq!(segment.sample_rate, 11025);
    assert_eq!(segment.channels, 1);
    assert_eq!(segment.bits_per_sample, 16);
    assert_eq!(segment.source, AudioStreamSource::Microphone);
}
