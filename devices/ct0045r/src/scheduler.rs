//! Fixed-rate transmission of queued output.

use std::time::Duration;

use tracing::{debug, trace, warn};
use wctablet_core::{OutboundChannel, Result, Timer, TimerHandle};

use crate::session::Session;

/// Drains a session to the line once per interval.
///
/// The timer is re-armed after every tick, whether or not anything was sent,
/// so output queued between ticks always goes out on the next one.
#[derive(Debug)]
pub struct Scheduler<T: Timer> {
    timer: T,
    interval: Duration,
    pending: Option<TimerHandle>,
}

impl<T: Timer> Scheduler<T> {
    pub fn new(timer: T, interval: Duration) -> Self {
        Self {
            timer,
            interval,
            pending: None,
        }
    }

    /// Arm the first tick. Does nothing if a tick is already pending.
    pub fn start(&mut self) {
        if self.pending.is_none() {
            self.arm();
        }
    }

    fn arm(&mut self) {
        self.pending = Some(self.timer.schedule_once(self.interval));
    }

    /// Run one tick for an expired timer. Stale handles are ignored.
    pub fn tick(
        &mut self,
        handle: TimerHandle,
        session: &mut Session,
        channel: &mut dyn OutboundChannel,
    ) -> Result<usize> {
        if self.pending != Some(handle) {
            trace!(?handle, "ignoring stale timer");
            return Ok(0);
        }
        self.pending = None;

        let bytes = session.drain_tick(channel.writable_capacity());
        let written = if bytes.is_empty() {
            Ok(0)
        } else {
            debug!(len = bytes.len(), "transmitting");
            channel.write(&bytes).map(|_| bytes.len()).inspect_err(|e| {
                warn!(error = %e, "channel refused {} bytes", bytes.len());
                session.discard_unsent(bytes.len());
            })
        };

        self.arm();
        written
    }

    /// Cancel the pending tick, if any
    pub fn cancel(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(handle) => self.timer.cancel(handle),
            None => Ok(()),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
