use anyhow::{bail, Result};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Monotonic session stopwatch.
///
/// Started once per controller lifetime and never restarted; segment offsets
/// are computed relative to it.
#[derive(Debug, Default)]
pub struct SessionClock {
    started: Mutex<Option<Instant>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock. Fails if it was already started.
    pub fn start(&self) -> Result<()> {
        let mut started = self.guard();
        if started.is_some() {
            bail!("Session clock already started");
        }
        *started = Some(Instant::now());
        Ok(())
    }

    pub fn start_if_not_started(&self) {
        let mut started = self.guard();
        if started.is_none() {
            *started = Some(Instant::now());
        }
    }

    pub fn is_started(&self) -> bool {
        self.guard().is_some()
    }

    /// Seconds elapsed since the clock started. Fails before `start`.
    pub fn seconds_since_start(&self) -> Result<f32> {
        match *self.guard() {
            Some(started) => Ok(started.elapsed().as_secs_f32()),
            None => bail!("Session clock not started"),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<Instant>> {
        match self.started.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
