//! Controller session: identity gate plus the blocking decode loop
//!
//! ```text
//! DeviceHandle ──► bind(profile) ──► Bound ──► run(sink) ──► Stopped ──► teardown
//!                      │
//!                      └─ IdentityMismatch (handle closed)
//! ```
//!
//! `run` occupies the calling thread until the device goes away or the sink
//! stops accepting events. Wrap a bound session in a [`SessionTask`] to hand
//! it to a thread or to tokio's blocking pool.

use statum::{machine, state};
use std::path::PathBuf;
use std::thread;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::controller::device::{DeviceHandle, RawEvent, RawEventKind};
use crate::controller::event_queue::EventQueueReader;
use crate::controller::profile::ControllerProfile;
use crate::controller::sink::{ButtonState, EventSink, SemanticEvent};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Device {}:{actual} is not a {expected} controller", .path.display())]
    IdentityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

/// Why a decode loop ended. Neither case is a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Read failed, usually because the controller was unplugged
    Disconnected,
    /// The sink refused an event
    SinkClosed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub chunks: u64,
    pub emitted: u64,
    pub unrecognized: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub reason: StopReason,
}

/// Maps one raw event to its semantic form.
///
/// Indices at or above the profile's declared count are unrecognized. An
/// in-range index with no table entry returns `None` and is skipped. Axis
/// values pass through untouched.
pub fn decode(raw: &RawEvent, profile: &ControllerProfile) -> Option<SemanticEvent> {
    let unrecognized = SemanticEvent::Unrecognized {
        kind: raw.kind,
        index: raw.index,
        value: raw.value,
    };

    match raw.kind {
        RawEventKind::Button => {
            if raw.index >= profile.button_count {
                return Some(unrecognized);
            }
            profile
                .lookup_button(raw.index)
                .map(|name| SemanticEvent::Button {
                    name,
                    state: ButtonState::from_value(raw.value),
                })
        }
        RawEventKind::Axis => {
            if raw.index >= profile.axis_count {
                return Some(unrecognized);
            }
            profile
                .lookup_axis(raw.index)
                .map(|spec| SemanticEvent::Axis {
                    name: spec.name,
                    value: raw.value,
                })
        }
        RawEventKind::Other(_) => Some(unrecognized),
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Bound,
    Stopped(SessionReport),
}

#[machine]
#[derive(Debug)]
pub struct ControllerSession<S: SessionState> {
    // Exclusively owned; never shared with another reader
    handle: DeviceHandle,

    profile: &'static ControllerProfile,

    stats: SessionStats,
}

impl<S: SessionState> ControllerSession<S> {
    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn profile(&self) -> &'static ControllerProfile {
        self.profile
    }
}

impl ControllerSession<Bound> {
    /// Binds a handle to a profile if the reported name matches the signature
    /// exactly. On mismatch the handle is closed before the error is returned.
    pub fn bind(
        mut handle: DeviceHandle,
        profile: &'static ControllerProfile,
    ) -> Result<Self, SessionError> {
        if !profile.matches(handle.name()) {
            let err = SessionError::IdentityMismatch {
                path: handle.path().to_path_buf(),
                expected: profile.signature.to_string(),
                actual: handle.name().to_string(),
            };
            handle.close();
            warn!("{}", err);
            return Err(err);
        }

        info!(
            "Bound {} to profile {}",
            handle.path().display(),
            profile.key
        );
        Ok(Self::new(handle, profile, SessionStats::default()))
    }

    /// Gives up the decode loop and hands the validated device to a
    /// queue-filling reader instead.
    pub fn into_reader(self) -> EventQueueReader {
        EventQueueReader::new(self.handle)
    }

    /// Runs the decode loop until the device disconnects or the sink closes.
    ///
    /// Each chunk is fully decoded and forwarded before the next read.
    pub fn run<K: EventSink + ?Sized>(mut self, sink: &mut K) -> ControllerSession<Stopped> {
        info!("Starting decode loop on {}", self.handle.path().display());

        let reason = loop {
            let events = match self.handle.read_chunk() {
                Ok(events) => events,
                Err(e) => {
                    info!("Controller stopped: {}", e);
                    break StopReason::Disconnected;
                }
            };
            self.stats.chunks += 1;

            if let Err(reason) = self.dispatch(events, sink) {
                break reason;
            }
        };

        info!(
            "Decode loop on {} ended ({:?}): {} chunks, {} events, {} unrecognized, {} skipped",
            self.handle.path().display(),
            reason,
            self.stats.chunks,
            self.stats.emitted,
            self.stats.unrecognized,
            self.stats.skipped
        );

        let report = SessionReport {
            stats: self.stats,
            reason,
        };
        self.transition_with(report)
    }

    fn dispatch<K: EventSink + ?Sized>(
        &mut self,
        events: Vec<RawEvent>,
        sink: &mut K,
    ) -> Result<(), StopReason> {
        for raw in events {
            forward(&raw, self.profile, sink, &mut self.stats)?;
        }
        Ok(())
    }
}

/// Decodes one raw event and hands it to the sink, keeping `stats` current.
pub fn forward<K: EventSink + ?Sized>(
    raw: &RawEvent,
    profile: &ControllerProfile,
    sink: &mut K,
    stats: &mut SessionStats,
) -> Result<(), StopReason> {
    let Some(event) = decode(raw, profile) else {
        debug!("No table entry for {:?} index {}, skipping", raw.kind, raw.index);
        stats.skipped += 1;
        return Ok(());
    };

    if event.is_unrecognized() {
        stats.unrecognized += 1;
    }

    if let Err(e) = sink.emit(event) {
        error!("Event sink rejected event: {}", e);
        return Err(StopReason::SinkClosed);
    }
    stats.emitted += 1;
    Ok(())
}

impl ControllerSession<Stopped> {
    pub fn report(&self) -> Option<&SessionReport> {
        self.get_state_data()
    }

    /// Closes the underlying device and discards the session.
    pub fn teardown(mut self) -> Option<SessionReport> {
        self.handle.close();
        self.report().copied()
    }
}

/// Which consumer drives the device inside a [`SessionTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskMode {
    Loop,
    Queue,
}

/// Unit of work owning a bound session and its sink
pub struct SessionTask<K> {
    session: ControllerSession<Bound>,
    sink: K,
    mode: TaskMode,
}

impl<K: EventSink + Send + 'static> SessionTask<K> {
    /// Task running the blocking decode loop
    pub fn new(session: ControllerSession<Bound>, sink: K) -> Self {
        Self {
            session,
            sink,
            mode: TaskMode::Loop,
        }
    }

    /// Task pulling chunks through an [`EventQueueReader`] instead
    pub fn queued(session: ControllerSession<Bound>, sink: K) -> Self {
        Self {
            session,
            sink,
            mode: TaskMode::Queue,
        }
    }

    /// Runs the session to completion on the current thread and releases the
    /// device.
    pub fn run(self) -> Option<SessionReport> {
        let Self {
            session,
            mut sink,
            mode,
        } = self;
        match mode {
            TaskMode::Loop => session.run(&mut sink).teardown(),
            TaskMode::Queue => {
                let profile = session.profile();
                Some(session.into_reader().run(profile, &mut sink))
            }
        }
    }

    /// Runs on a dedicated OS thread
    pub fn spawn(self) -> std::io::Result<thread::JoinHandle<Option<SessionReport>>> {
        let name = format!("padwatch-{}", self.session.handle().path().display());
        thread::Builder::new().name(name).spawn(move || self.run())
    }

    /// Runs on tokio's blocking pool. Requires an active runtime.
    pub fn spawn_blocking(self) -> JoinHandle<Option<SessionReport>> {
        tokio::task::spawn_blocking(move || self.run())
    }
}
