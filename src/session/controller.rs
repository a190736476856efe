use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::SessionClock;
use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{AudioSegment, CaptureDevice, CaptureDeviceFactory, Segmenter};
use crate::sink::SegmentSink;

/// Request id passed to the host's permission gate and expected back in
/// `on_permission_result`.
pub const AUDIO_PERMISSION_REQUEST: u32 = 999_876;

const CAPTURE_THREAD_NAME: &str = "segcap-capture";

/// Host callback used to ask for capture permission.
///
/// Invoked after the controller lock is released; the host answers via
/// `SessionController::on_permission_result`, possibly from another thread.
pub trait PermissionGate: Send + Sync {
    fn request(&self, request_id: u32);
}

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AwaitingPermission,
    Recording,
    Muted,
}

impl CaptureState {
    pub fn label(self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::AwaitingPermission => "awaiting-permission",
            CaptureState::Recording => "recording",
            CaptureState::Muted => "muted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permission {
    Undecided,
    Granted,
    Denied,
}

struct Shared {
    state: CaptureState,
    attached: bool,
    foreground: bool,
    permission: Permission,
    /// Stop flag for the current worker. The worker clears it on natural
    /// exit; the controller clears it to request a stop.
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Owns the capture lifecycle state machine and the worker thread.
///
/// All lifecycle and control calls synchronize on a single lock around the
/// small `Shared` state struct. The worker thread never takes that lock, so
/// signal-and-join under the lock cannot deadlock and no call blocks the
/// host beyond a brief lock acquisition plus one frame read.
pub struct SessionController {
    config: SessionConfig,
    factory: Box<dyn CaptureDeviceFactory>,
    sink: Arc<dyn SegmentSink>,
    gate: Option<Box<dyn PermissionGate>>,
    clock: SessionClock,
    started_at: DateTime<Utc>,
    segments_emitted: Arc<AtomicUsize>,
    /// End of the last emitted segment, in session-offset milliseconds.
    /// Anchors restarted captures so offsets never rewind.
    emitted_high_water_ms: Arc<AtomicU64>,
    shared: Mutex<Shared>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        factory: Box<dyn CaptureDeviceFactory>,
        sink: Arc<dyn SegmentSink>,
    ) -> Self {
        info!("Creating capture session: {}", config.session_id);

        Self {
            config,
            factory,
            sink,
            gate: None,
            clock: SessionClock::new(),
            started_at: Utc::now(),
            segments_emitted: Arc::new(AtomicUsize::new(0)),
            emitted_high_water_ms: Arc::new(AtomicU64::new(0)),
            shared: Mutex::new(Shared {
                state: CaptureState::Idle,
                attached: false,
                foreground: false,
                permission: Permission::Undecided,
                running: Arc::new(AtomicBool::new(false)),
                worker: None,
            }),
        }
    }

    /// Register the host callback used to prompt for capture permission.
    pub fn with_permission_gate(mut self, gate: Box<dyn PermissionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Attach to a host. Starts the session clock on first attach.
    pub fn attach(&self) {
        let mut shared = self.lock_shared();
        shared.attached = true;
        self.clock.start_if_not_started();
        info!("Session controller attached: {}", self.config.session_id);
    }

    /// Detach from the host, forcibly stopping any capture in flight.
    pub fn detach(&self) {
        let mut shared = self.lock_shared();
        Self::stop_worker(&mut shared);
        shared.attached = false;
        shared.foreground = false;
        if matches!(
            shared.state,
            CaptureState::Recording | CaptureState::AwaitingPermission
        ) {
            shared.state = CaptureState::Idle;
        }
        info!("Session controller detached");
    }

    /// Host moved to the foreground; start capture if permitted.
    pub fn on_foreground(&self) {
        let mut should_request = false;
        {
            let mut shared = self.lock_shared();
            Self::reconcile(&mut shared);
            shared.foreground = true;

            if !shared.attached {
                warn!("Foreground event while detached; capture stays off");
            } else {
                match shared.state {
                    CaptureState::Recording => debug!("Already recording; foreground is a no-op"),
                    CaptureState::Muted => debug!("Foregrounded while muted"),
                    CaptureState::AwaitingPermission => {
                        debug!("Still waiting for a permission result")
                    }
                    CaptureState::Idle => match shared.permission {
                        Permission::Granted => self.start_capture(&mut shared),
                        Permission::Denied => warn!(
                            "Capture permission was denied; restart the process to retry"
                        ),
                        Permission::Undecided => {
                            if self.gate.is_some() {
                                shared.state = CaptureState::AwaitingPermission;
                                should_request = true;
                            } else {
                                warn!("No permission gate registered; capture stays off");
                            }
                        }
                    },
                }
            }
        }

        if should_request {
            self.request_permission();
        }
    }

    /// Host moved to the background; stop capture and flush in-flight audio.
    pub fn on_background(&self) {
        let mut shared = self.lock_shared();
        Self::reconcile(&mut shared);
        shared.foreground = false;

        if shared.state == CaptureState::Recording {
            Self::stop_worker(&mut shared);
            shared.state = CaptureState::Idle;
            info!("Backgrounded; capture stopped");
        }
    }

    /// Temporarily disallow capture, releasing the device.
    pub fn mute(&self) {
        let mut shared = self.lock_shared();
        Self::reconcile(&mut shared);

        if shared.state == CaptureState::Muted {
            return;
        }
        if shared.state == CaptureState::Recording {
            Self::stop_worker(&mut shared);
        }
        shared.state = CaptureState::Muted;
        info!("Capture muted; device released");
    }

    /// Allow capture again. Resumes only if still attached and foregrounded.
    pub fn unmute(&self) {
        let mut should_request = false;
        {
            let mut shared = self.lock_shared();
            if shared.state != CaptureState::Muted {
                return;
            }

            info!("Capture unmuted");

            if shared.foreground && shared.attached {
                match shared.permission {
                    Permission::Granted => self.start_capture(&mut shared),
                    Permission::Denied => {
                        shared.state = CaptureState::Idle;
                        warn!("Capture permission was denied; restart the process to retry");
                    }
                    Permission::Undecided => {
                        if self.gate.is_some() {
                            shared.state = CaptureState::AwaitingPermission;
                            should_request = true;
                        } else {
                            shared.state = CaptureState::Idle;
                            warn!("No permission gate registered; capture stays off");
                        }
                    }
                }
            } else {
                shared.state = CaptureState::Idle;
            }
        }

        if should_request {
            self.request_permission();
        }
    }

    /// Permission result callback, consumed from the host framework.
    pub fn on_permission_result(&self, request_id: u32, granted: bool) {
        if request_id != AUDIO_PERMISSION_REQUEST {
            debug!("Ignoring permission result for unknown request {}", request_id);
            return;
        }

        let mut shared = self.lock_shared();
        Self::reconcile(&mut shared);

        if granted {
            info!("Capture permission granted");
            shared.permission = Permission::Granted;
            if shared.state == CaptureState::AwaitingPermission {
                if shared.foreground && shared.attached {
                    self.start_capture(&mut shared);
                } else {
                    shared.state = CaptureState::Idle;
                }
            }
        } else {
            warn!("Capture permission denied; automatic retries suppressed");
            shared.permission = Permission::Denied;
            if shared.state == CaptureState::AwaitingPermission {
                shared.state = CaptureState::Idle;
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        let mut shared = self.lock_shared();
        Self::reconcile(&mut shared);
        shared.state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == CaptureState::Recording
    }

    pub fn stats(&self) -> SessionStats {
        let mut shared = self.lock_shared();
        Self::reconcile(&mut shared);

        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStats {
            is_recording: shared.state == CaptureState::Recording,
            state: shared.state.label().to_string(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            segments_emitted: self.segments_emitted.load(Ordering::SeqCst),
        }
    }

    /// Spawn the capture worker. Idempotent: any prior worker is stopped and
    /// joined first, so at most one capture thread exists at a time.
    fn start_capture(&self, shared: &mut Shared) {
        Self::stop_worker(shared);

        let device = match self.factory.open() {
            Ok(device) => device,
            Err(e) => {
                error!(
                    "Cannot record: {} device initialization failed: {:#}",
                    self.factory.name(),
                    e
                );
                shared.state = CaptureState::Idle;
                return;
            }
        };

        // A device can deliver audio faster than wall time passes (file
        // playback, buffered hardware). Anchor restarts to the end of the
        // audio already emitted so offsets never rewind mid-session.
        let clock_offset = self.clock.seconds_since_start().unwrap_or(0.0);
        let emitted_end = self.emitted_high_water_ms.load(Ordering::SeqCst) as f32 / 1000.0;
        let base_offset = clock_offset.max(emitted_end);
        let segmenter = Segmenter::new(self.config.segment_duration, base_offset);
        let running = Arc::new(AtomicBool::new(true));

        let sink = Arc::clone(&self.sink);
        let segments_emitted = Arc::clone(&self.segments_emitted);
        let high_water = Arc::clone(&self.emitted_high_water_ms);
        let flag = Arc::clone(&running);

        let spawned = std::thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || {
                capture_loop(device, segmenter, sink, segments_emitted, high_water, flag)
            });

        match spawned {
            Ok(handle) => {
                shared.running = running;
                shared.worker = Some(handle);
                shared.state = CaptureState::Recording;
                info!("Started recording");
            }
            Err(e) => {
                error!("Failed to spawn capture thread: {}", e);
                shared.state = CaptureState::Idle;
            }
        }
    }

    /// Signal the worker to stop and wait for it to flush and exit.
    ///
    /// The worker never takes the controller lock, so joining while holding
    /// it is safe.
    fn stop_worker(shared: &mut Shared) {
        shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = shared.worker.take() {
            if handle.join().is_err() {
                error!("Capture thread panicked");
            }
            info!("Stopped recording");
        }
    }

    /// The worker clears its running flag when the device stream ends; fold
    /// that back into the state machine before acting on it.
    fn reconcile(shared: &mut Shared) {
        if shared.state == CaptureState::Recording && !shared.running.load(Ordering::SeqCst) {
            if let Some(handle) = shared.worker.take() {
                if handle.join().is_err() {
                    error!("Capture thread panicked");
                }
            }
            shared.state = CaptureState::Idle;
            debug!("Capture stream ended; back to idle");
        }
    }

    fn request_permission(&self) {
        if let Some(gate) = &self.gate {
            info!(
                "Requesting capture permission (request {})",
                AUDIO_PERMISSION_REQUEST
            );
            gate.request(AUDIO_PERMISSION_REQUEST);
        }
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        match self.shared.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let mut shared = self.lock_shared();
        Self::stop_worker(&mut shared);
    }
}

/// The capture loop, run on the dedicated worker thread.
///
/// Reads frames until the stop flag clears or the stream ends, rotating
/// segments as the threshold elapses. Transient read failures are skipped;
/// sink failures are logged and never stop the loop. On exit the in-flight
/// segment is flushed so a stop never drops buffered audio.
fn capture_loop(
    mut device: Box<dyn CaptureDevice>,
    mut segmenter: Segmenter,
    sink: Arc<dyn SegmentSink>,
    segments_emitted: Arc<AtomicUsize>,
    high_water_ms: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) {
    debug!("Capture thread started");

    while running.load(Ordering::SeqCst) {
        match device.next_frame() {
            Ok(Some(frame)) => {
                if let Some(segment) = segmenter.push(&frame) {
                    emit(sink.as_ref(), segment, &segments_emitted, &high_water_ms);
                }
            }
            Ok(None) => {
                debug!("Capture device reached end of stream");
                break;
            }
            Err(e) => {
                warn!("Frame read failed, skipping: {:#}", e);
            }
        }
    }

    if let Some(segment) = segmenter.finish() {
        emit(sink.as_ref(), segment, &segments_emitted, &high_water_ms);
    }

    running.store(false, Ordering::SeqCst);
    debug!("Capture thread stopped");
}

fn emit(
    sink: &dyn SegmentSink,
    segment: AudioSegment,
    segments_emitted: &AtomicUsize,
    high_water_ms: &AtomicU64,
) {
    let offset = segment.offset_seconds;
    let bytes = segment.payload.len();

    // Advance the high-water mark even if the sink rejects the segment; the
    // audio was still captured at that offset.
    let end_ms = ((offset as f64 + segment.duration_seconds()) * 1000.0) as u64;
    high_water_ms.fetch_max(end_ms, Ordering::SeqCst);

    match sink.emit(segment) {
        Ok(()) => {
            segments_emitted.fetch_add(1, Ordering::SeqCst);
            info!("Emitted segment at offset {:.1}s ({} bytes)", offset, bytes);
        }
        Err(e) => error!("Failed to emit segment at offset {:.1}s: {:#}", offset, e),
    }
}
