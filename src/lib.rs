pub mod audio;
pub mod config;
pub mod session;
pub mod sink;

pub use audio::{
    AudioFrame, AudioSegment, AudioStreamSource, CaptureDevice, CaptureDeviceFactory,
    DeviceConfig, Segmenter, WavCaptureDevice, WavFileFactory,
};
pub use config::Config;
pub use session::{
    CaptureState, PermissionGate, SessionClock, SessionConfig, SessionController, SessionStats,
    AUDIO_PERMISSION_REQUEST,
};
pub use sink::{NatsSink, SegmentMessage, SegmentSink, WavSink};
