use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether a capture worker is currently running
    pub is_recording: bool,

    /// Current lifecycle state label
    pub state: String,

    /// When the controller was created
    pub started_at: DateTime<Utc>,

    /// Total controller lifetime in seconds
    pub duration_secs: f64,

    /// Number of segments emitted to the sink so far
    pub segments_emitted: usize,
}
