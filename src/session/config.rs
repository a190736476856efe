use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::DeviceConfig;

/// Configuration for a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (used by sinks for naming and routing)
    pub session_id: String,

    /// Duration of each audio segment before rotating
    /// Default: 15 seconds
    pub segment_duration: Duration,

    /// Capture format requested from the device factory
    pub device: DeviceConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            segment_duration: Duration::from_secs(15),
            device: DeviceConfig::default(),
        }
    }
}
