//! Capture session lifecycle management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - The lifecycle state machine (foreground/background, mute/unmute)
//! - Permission request/result handling
//! - The dedicated capture worker thread and its cooperative stop
//! - Session statistics

mod clock;
mod config;
mod controller;
mod stats;

pub use clock::SessionClock;
pub use config::SessionConfig;
pub use controller::{CaptureState, PermissionGate, SessionController, AUDIO_PERMISSION_REQUEST};
pub use stats::SessionStats;
