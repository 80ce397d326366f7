//! Controller subsystem for joystick-API devices
//!
//! ```text
//! DeviceHandle ──► ControllerSession ──► EventSink
//!  (RawEvent)       (ControllerProfile)   (SemanticEvent)
//! ```
//!
//! 1. [`device`] - Device node ownership and raw record decoding
//! 2. [`profile`] - Compiled-in per-model index tables
//! 3. [`session`] - Identity gate and blocking decode loop
//! 4. [`event_queue`] - Queue-filling alternative to the decode loop
//! 5. [`sink`] - Semantic events and their consumers

pub mod device;
pub mod event_queue;
pub mod profile;
pub mod session;
pub mod sink;

pub use device::{DeviceError, DeviceHandle, RawEvent, RawEventKind};
pub use event_queue::{wait_for_events, EventQueueReader};
pub use profile::{ControllerProfile, LOGITECH_F710};
pub use session::{
    decode, forward, Bound, ControllerSession, SessionError, SessionReport, SessionStats, SessionTask,
    StopReason, Stopped,
};
pub use sink::{ButtonState, ChannelSink, ConsoleSink, EventSink, SemanticEvent, SinkError};
