//! Device handle for joystick-API nodes (`/dev/input/jsX`)
//!
//! Owns the open node, answers the three capability queries once at open time
//! and turns raw `read()` results into [`RawEvent`] batches. Everything that
//! touches the kernel sits behind [`JoystickNode`], so the handle logic can run
//! against any backend that honours the same four operations.

use nix::{ioctl_read, ioctl_read_buf};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum number of records pulled by a single read
pub const MAX_BATCH: usize = 100;

/// Size of one `struct js_event` on the wire
pub const RECORD_SIZE: usize = 8;

/// Placeholder used when the node refuses to report its name
pub const UNKNOWN_NAME: &str = "Unknown";

const READ_BUFFER_SIZE: usize = MAX_BATCH * RECORD_SIZE;
const NAME_CAPACITY: usize = 128;

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;

// <linux/joystick.h>: JSIOCGAXES, JSIOCGBUTTONS, JSIOCGNAME(len)
ioctl_read!(js_axis_count, b'j', 0x11, u8);
ioctl_read!(js_button_count, b'j', 0x12, u8);
ioctl_read_buf!(js_name, b'j', 0x13, u8);

/// Classification of the raw `type` byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Button,
    Axis,
    /// Init markers (0x80 bit) and anything the protocol adds later, kept verbatim
    Other(u8),
}

impl RawEventKind {
    pub fn from_raw(kind: u8) -> Self {
        match kind {
            JS_EVENT_BUTTON => RawEventKind::Button,
            JS_EVENT_AXIS => RawEventKind::Axis,
            other => RawEventKind::Other(other),
        }
    }

    pub fn raw(&self) -> u8 {
        match self {
            RawEventKind::Button => JS_EVENT_BUTTON,
            RawEventKind::Axis => JS_EVENT_AXIS,
            RawEventKind::Other(raw) => *raw,
        }
    }
}

/// One decoded `struct js_event`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Kernel timestamp in milliseconds, arbitrary epoch
    pub timestamp_ms: u32,
    pub value: i16,
    pub kind: RawEventKind,
    pub index: u8,
}

impl RawEvent {
    // { __u32 time; __s16 value; __u8 type; __u8 number; } in native byte order
    pub fn from_record(record: &[u8; RECORD_SIZE]) -> Self {
        Self {
            timestamp_ms: u32::from_ne_bytes([record[0], record[1], record[2], record[3]]),
            value: i16::from_ne_bytes([record[4], record[5]]),
            kind: RawEventKind::from_raw(record[6]),
            index: record[7],
        }
    }
}

/// Splits a byte run into whole records and the trailing partial record, if any.
pub fn decode_records(bytes: &[u8]) -> (Vec<RawEvent>, &[u8]) {
    let chunks = bytes.chunks_exact(RECORD_SIZE);
    let rest = chunks.remainder();
    let events = chunks
        .map(|chunk| {
            let mut record = [0u8; RECORD_SIZE];
            record.copy_from_slice(chunk);
            RawEvent::from_record(&record)
        })
        .collect();
    (events, rest)
}

/// Opaque OS capability behind a [`DeviceHandle`].
///
/// Closing is dropping: a node releases its resource when it goes out of scope.
pub trait JoystickNode: Send {
    fn name(&self) -> io::Result<String>;
    fn axis_count(&self) -> io::Result<u8>;
    fn button_count(&self) -> io::Result<u8>;

    /// One blocking read into `buf`, returning the byte count
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Joystick-API node opened read-only through the filesystem
pub struct LinuxJoystick {
    file: File,
}

impl LinuxJoystick {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Ok(Self { file })
    }
}

impl JoystickNode for LinuxJoystick {
    fn name(&self) -> io::Result<String> {
        let mut buf = [0u8; NAME_CAPACITY];
        unsafe { js_name(self.file.as_raw_fd(), &mut buf) }.map_err(io::Error::from)?;
        let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    fn axis_count(&self) -> io::Result<u8> {
        let mut count = 0u8;
        unsafe { js_axis_count(self.file.as_raw_fd(), &mut count) }.map_err(io::Error::from)?;
        Ok(count)
    }

    fn button_count(&self) -> io::Result<u8> {
        let mut count = 0u8;
        unsafe { js_button_count(self.file.as_raw_fd(), &mut count) }
            .map_err(io::Error::from)?;
        Ok(count)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Could not open game controller {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Read from {} failed: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Device {} is closed", .path.display())]
    Closed { path: PathBuf },
}

/// Live connection to one controller node.
///
/// Name and counts are queried once and never change for the handle's lifetime.
/// After [`close`](DeviceHandle::close) every read fails with
/// [`DeviceError::Closed`]; closing twice is a no-op.
pub struct DeviceHandle {
    path: PathBuf,
    name: String,
    axis_count: u8,
    button_count: u8,
    node: Option<Box<dyn JoystickNode>>,
    // Bytes of a record split across two reads; always shorter than RECORD_SIZE
    pending: Vec<u8>,
}

impl DeviceHandle {
    /// Opens a joystick-API node such as `/dev/input/js0`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        debug!("Opening game controller at {}", path.display());

        let node = LinuxJoystick::open(path).map_err(|source| DeviceError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_node(path, Box::new(node)))
    }

    /// Wraps an already opened node and runs the capability queries.
    pub fn from_node(path: impl Into<PathBuf>, node: Box<dyn JoystickNode>) -> Self {
        let path = path.into();

        let name = node.name().unwrap_or_else(|e| {
            warn!("Name query on {} failed: {}", path.display(), e);
            UNKNOWN_NAME.to_string()
        });
        let axis_count = node.axis_count().unwrap_or_else(|e| {
            warn!("Axis count query on {} failed: {}", path.display(), e);
            0
        });
        let button_count = node.button_count().unwrap_or_else(|e| {
            warn!("Button count query on {} failed: {}", path.display(), e);
            0
        });

        info!(
            "Opened {} \"{}\" with {} axes and {} buttons",
            path.display(),
            name,
            axis_count,
            button_count
        );

        Self {
            path,
            name,
            axis_count,
            button_count,
            node: Some(node),
            pending: Vec::with_capacity(RECORD_SIZE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis_count(&self) -> u8 {
        self.axis_count
    }

    pub fn button_count(&self) -> u8 {
        self.button_count
    }

    pub fn is_open(&self) -> bool {
        self.node.is_some()
    }

    /// Performs one blocking read of at most [`MAX_BATCH`] records.
    ///
    /// An empty batch is a valid result. A trailing partial record is held
    /// back and completed by the next read. Any error means the device is gone
    /// (or was closed) and no further reads should be issued.
    pub fn read_chunk(&mut self) -> Result<Vec<RawEvent>, DeviceError> {
        let node = self.node.as_mut().ok_or_else(|| DeviceError::Closed {
            path: self.path.clone(),
        })?;

        let carried = self.pending.len();
        let mut buf = [0u8; READ_BUFFER_SIZE];
        buf[..carried].copy_from_slice(&self.pending);

        let read = match node.read(&mut buf[carried..]) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                debug!("Read on {} interrupted, returning empty batch", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(DeviceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let (events, rest) = decode_records(&buf[..carried + read]);
        if !rest.is_empty() {
            debug!(
                "Holding {} bytes of a partial record from {}",
                rest.len(),
                self.path.display()
            );
        }
        self.pending.clear();
        self.pending.extend_from_slice(rest);

        debug!("Read {} events from {}", events.len(), self.path.display());
        Ok(events)
    }

    /// Releases the node. Safe to call any number of times.
    pub fn close(&mut self) {
        if self.node.take().is_some() {
            self.pending.clear();
            info!("Closed game controller {}", self.path.display());
        }
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("axis_count", &self.axis_count)
            .field("button_count", &self.button_count)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Encodes one record the way the kernel lays it out
    pub fn record(timestamp_ms: u32, value: i16, kind: u8, index: u8) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        bytes.extend_from_slice(&timestamp_ms.to_ne_bytes());
        bytes.extend_from_slice(&value.to_ne_bytes());
        bytes.push(kind);
        bytes.push(index);
        bytes
    }

    /// In-memory node that replays scripted reads, then reports ENODEV
    pub struct ScriptedNode {
        pub name: Option<String>,
        pub axes: u8,
        pub buttons: u8,
        pub reads: VecDeque<io::Result<Vec<u8>>>,
        pub read_calls: Arc<std::sync::atomic::AtomicUsize>,
        pub dropped: Arc<AtomicBool>,
    }

    impl ScriptedNode {
        pub fn new(name: &str, axes: u8, buttons: u8) -> Self {
            Self {
                name: Some(name.to_string()),
                axes,
                buttons,
                reads: VecDeque::new(),
                read_calls: Arc::new(Default::default()),
                dropped: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn nameless(axes: u8, buttons: u8) -> Self {
            let mut node = Self::new("", axes, buttons);
            node.name = None;
            node
        }

        pub fn push_read(mut self, bytes: Vec<u8>) -> Self {
            self.reads.push_back(Ok(bytes));
            self
        }

        pub fn push_error(mut self, kind: io::ErrorKind) -> Self {
            self.reads.push_back(Err(io::Error::from(kind)));
            self
        }
    }

    impl JoystickNode for ScriptedNode {
        fn name(&self) -> io::Result<String> {
            self.name
                .clone()
                .ok_or_else(|| io::Error::from(io::ErrorKind::Unsupported))
        }

        fn axis_count(&self) -> io::Result<u8> {
            Ok(self.axes)
        }

        fn button_count(&self) -> io::Result<u8> {
            Ok(self.buttons)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from_raw_os_error(nix::libc::ENODEV)),
            }
        }
    }

    impl Drop for ScriptedNode {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }
}
