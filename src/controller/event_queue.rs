//! Pull-style consumption: raw events appended to a caller-owned queue
//!
//! Alternative to [`ControllerSession::run`](super::session::ControllerSession)
//! for callers that drive their own control flow. Same single-reader rule: only
//! one thread may pull from a handle at a time.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::controller::device::{DeviceError, DeviceHandle, RawEvent};
use crate::controller::profile::ControllerProfile;
use crate::controller::session::{forward, SessionReport, SessionStats, StopReason};
use crate::controller::sink::EventSink;

/// Performs one read and appends the events to `queue` in arrival order.
///
/// Returns how many events were appended; zero is a valid result. An error
/// means the device is gone and the caller should stop pulling.
pub fn wait_for_events(
    handle: &mut DeviceHandle,
    queue: &mut VecDeque<RawEvent>,
) -> Result<usize, DeviceError> {
    let events = handle.read_chunk()?;
    let count = events.len();
    queue.extend(events);
    debug!("Queued {} events, {} pending", count, queue.len());
    Ok(count)
}

/// Owns a handle and the queue it fills
#[derive(Debug)]
pub struct EventQueueReader {
    handle: DeviceHandle,
    queue: VecDeque<RawEvent>,
}

impl EventQueueReader {
    pub fn new(handle: DeviceHandle) -> Self {
        Self {
            handle,
            queue: VecDeque::new(),
        }
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    /// Reads one chunk into the internal queue
    pub fn fill(&mut self) -> Result<usize, DeviceError> {
        wait_for_events(&mut self.handle, &mut self.queue)
    }

    pub fn pop(&mut self) -> Option<RawEvent> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn into_handle(self) -> DeviceHandle {
        self.handle
    }

    /// Decodes everything currently queued, front first.
    ///
    /// Stops at the first event the sink refuses; the rest stay queued.
    pub fn drain<K: EventSink + ?Sized>(
        &mut self,
        profile: &ControllerProfile,
        sink: &mut K,
        stats: &mut SessionStats,
    ) -> Result<(), StopReason> {
        while let Some(raw) = self.queue.pop_front() {
            forward(&raw, profile, sink, stats)?;
        }
        Ok(())
    }

    /// Fill-then-drain until the device goes away or the sink closes, then
    /// closes the device.
    pub fn run<K: EventSink + ?Sized>(
        mut self,
        profile: &ControllerProfile,
        sink: &mut K,
    ) -> SessionReport {
        info!("Starting queue reader on {}", self.handle.path().display());
        let mut stats = SessionStats::default();

        let reason = loop {
            if let Err(e) = self.fill() {
                info!("Controller stopped: {}", e);
                break StopReason::Disconnected;
            }
            stats.chunks += 1;

            if let Err(reason) = self.drain(profile, sink, &mut stats) {
                break reason;
            }
        };

        info!(
            "Queue reader on {} ended ({:?}): {} chunks, {} events, {} unrecognized, {} skipped",
            self.handle.path().display(),
            reason,
            stats.chunks,
            stats.emitted,
            stats.unrecognized,
            stats.skipped
        );
        self.handle.close();

        SessionReport { stats, reason }
    }
}
