pub mod device;
pub mod file;
pub mod segment;

pub use device::{AudioFrame, AudioStreamSource, CaptureDevice, CaptureDeviceFactory, DeviceConfig};
pub use file::{WavCaptureDevice, WavFileFactory};
pub use segment::{AudioSegment, Segmenter};
