use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::SegmentSink;
use crate::audio::AudioSegment;

/// Segment message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMessage {
    pub session_id: String,
    pub sequence: u32,
    /// Base64-encoded little-endian 16-bit PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    /// Seconds since the session started, measured at the segment start
    pub offset_seconds: f32,
    /// RFC3339 publish timestamp
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_segment: bool,
}

impl SegmentMessage {
    pub fn from_segment(session_id: &str, sequence: u32, segment: &AudioSegment) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(&segment.payload),
            sample_rate: segment.sample_rate,
            bits_per_sample: segment.bits_per_sample,
            channels: segment.channels,
            offset_seconds: segment.offset_seconds,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_segment: false,
        }
    }

    /// Empty end-of-session marker.
    pub fn final_marker(session_id: &str, sequence: u32) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            pcm: String::new(),
            sample_rate: 0,
            bits_per_sample: 16,
            channels: 0,
            offset_seconds: 0.0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_segment: true,
        }
    }
}

/// Publishes finished segments to NATS on `audio.segment.{session_id}`.
///
/// `emit` hands the segment to a background publish task over a bounded
/// channel so the capture thread never waits on the network. Call `close`
/// when the session ends: it drains the queue and waits for the task to
/// publish the final empty marker. A sink that is merely dropped closes the
/// channel too, but nothing then waits for the marker to go out before the
/// runtime shuts down.
pub struct NatsSink {
    tx: Mutex<Option<mpsc::Sender<AudioSegment>>>,
    publisher: Mutex<Option<JoinHandle<()>>>,
}

impl NatsSink {
    pub async fn connect(url: &str, session_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        let (tx, mut rx) = mpsc::channel::<AudioSegment>(64);
        let subject = format!("audio.segment.{}", session_id);

        let publisher = tokio::spawn(async move {
            let mut sequence: u32 = 0;

            while let Some(segment) = rx.recv().await {
                let bytes = segment.payload.len();
                let message = SegmentMessage::from_segment(&session_id, sequence, &segment);

                match serde_json::to_vec(&message) {
                    Ok(payload) => {
                        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                            error!("Failed to publish segment {}: {}", sequence, e);
                        } else {
                            info!(
                                "Published segment to {} (sequence={}, bytes={})",
                                subject, sequence, bytes
                            );
                        }
                    }
                    Err(e) => error!("Failed to encode segment message: {}", e),
                }

                sequence += 1;
            }

            let marker = SegmentMessage::final_marker(&session_id, sequence);
            match serde_json::to_vec(&marker) {
                Ok(payload) => {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        error!("Failed to publish final segment marker: {}", e);
                    }
                }
                Err(e) => error!("Failed to encode final segment marker: {}", e),
            }
        });

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            publisher: Mutex::new(Some(publisher)),
        })
    }

    /// Stop accepting segments, drain the publish queue, and wait for the
    /// final end-of-session marker to go out.
    pub async fn close(&self) -> Result<()> {
        // Dropping the only sender closes the channel; the publish task
        // drains what is queued and publishes the marker before exiting.
        drop(lock(&self.tx).take());

        let publisher = lock(&self.publisher).take();
        if let Some(publisher) = publisher {
            publisher.await.context("NATS publish task panicked")?;
            info!("NATS sink closed");
        }
        Ok(())
    }
}

impl SegmentSink for NatsSink {
    fn emit(&self, segment: AudioSegment) -> Result<()> {
        let guard = lock(&self.tx);
        let tx = guard
            .as_ref()
            .ok_or_else(|| anyhow!("NATS sink is closed; segment dropped"))?;
        tx.try_send(segment).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                anyhow!("NATS publish queue is full; segment dropped")
            }
            mpsc::error::TrySendError::Closed(_) => {
                anyhow!("NATS publish task stopped; segment dropped")
            }
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
