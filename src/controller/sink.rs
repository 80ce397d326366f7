//! Semantic events and the sinks that consume them

use chrono::Local;
use std::fmt;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::debug;

use crate::controller::device::RawEventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// Any nonzero raw value counts as pressed
    pub fn from_value(value: i16) -> Self {
        if value != 0 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonState::Pressed => f.write_str("pressed"),
            ButtonState::Released => f.write_str("released"),
        }
    }
}

/// Named representation of one raw event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticEvent {
    Button {
        name: &'static str,
        state: ButtonState,
    },
    Axis {
        name: &'static str,
        value: i16,
    },
    /// Out-of-range index or a kind the decoder does not model
    Unrecognized {
        kind: RawEventKind,
        index: u8,
        value: i16,
    },
}

impl SemanticEvent {
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, SemanticEvent::Unrecognized { .. })
    }
}

impl fmt::Display for SemanticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticEvent::Button { name, state } => write!(f, "{name} {state}"),
            SemanticEvent::Axis { name, value } => write!(f, "{name} value {value}"),
            SemanticEvent::Unrecognized { kind, index, value } => match kind {
                RawEventKind::Button => write!(
                    f,
                    "Button {index} {} undefined",
                    ButtonState::from_value(*value)
                ),
                RawEventKind::Axis => write!(f, "Axis {index} value {value} undefined"),
                RawEventKind::Other(raw) => write!(f, "Default {raw}"),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to write event: {0}")]
    Write(#[from] io::Error),

    #[error("Event receiver dropped")]
    ChannelClosed,
}

/// Consumer of decoded events, fed in arrival order
pub trait EventSink {
    fn emit(&mut self, event: SemanticEvent) -> Result<(), SinkError>;
}

impl EventSink for Vec<SemanticEvent> {
    fn emit(&mut self, event: SemanticEvent) -> Result<(), SinkError> {
        self.push(event);
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: SemanticEvent) -> Result<(), SinkError> {
        (**self).emit(event)
    }
}

/// Writes one text line per event
pub struct ConsoleSink<W: Write> {
    writer: W,
    timestamps: bool,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout(timestamps: bool) -> Self {
        Self::new(io::stdout(), timestamps)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(writer: W, timestamps: bool) -> Self {
        Self { writer, timestamps }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for ConsoleSink<W> {
    fn emit(&mut self, event: SemanticEvent) -> Result<(), SinkError> {
        if self.timestamps {
            writeln!(
                self.writer,
                "{} {}",
                Local::now().format("%H:%M:%S.%3f"),
                event
            )?;
        } else {
            writeln!(self.writer, "{event}")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards events into a tokio channel. Must be driven from a blocking
/// context (a plain thread or `spawn_blocking`).
pub struct ChannelSink {
    sender: mpsc::Sender<SemanticEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<SemanticEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: SemanticEvent) -> Result<(), SinkError> {
        self.sender.blocking_send(event).map_err(|e| {
            debug!("Dropping event, receiver gone: {:?}", e.0);
            SinkError::ChannelClosed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_state_follows_nonzero_value() {
        assert_eq!(ButtonState::from_value(0), ButtonState::Released);
        assert_eq!(ButtonState::from_value(1), ButtonState::Pressed);
        assert_eq!(ButtonState::from_value(-1), ButtonState::Pressed);
    }

    #[test]
    fn text_rendering() {
        let cases = [
            (
                SemanticEvent::Button {
                    name: "A - Green",
                    state: ButtonState::Pressed,
                },
                "A - Green pressed",
            ),
            (
                SemanticEvent::Axis {
                    name: "Left Trigger",
                    value: -32767,
                },
                "Left Trigger value -32767",
            ),
            (
                SemanticEvent::Unrecognized {
                    kind: RawEventKind::Button,
                    index: 50,
                    value: 0,
                },
                "Button 50 released undefined",
            ),
            (
                SemanticEvent::Unrecognized {
                    kind: RawEventKind::Axis,
                    index: 9,
                    value: 12,
                },
                "Axis 9 value 12 undefined",
            ),
            (
                SemanticEvent::Unrecognized {
                    kind: RawEventKind::Other(0x81),
                    index: 0,
                    value: 0,
                },
                "Default 129",
            ),
        ];

        for (event, text) in cases {
            assert_eq!(event.to_string(), text);
        }
    }

    #[test]
    fn console_sink_writes_one_line_per_event() {
        let mut sink = ConsoleSink::new(Vec::new(), false);
        sink.emit(SemanticEvent::Button {
            name: "Start",
            state: ButtonState::Pressed,
        })
        .expect("emit");
        sink.emit(SemanticEvent::Button {
            name: "Start",
            state: ButtonState::Released,
        })
        .expect("emit");

        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        assert_eq!(text, "Start pressed\nStart released\n");
    }

    #[test]
    fn console_sink_prefixes_wall_clock_when_asked() {
        let mut sink = ConsoleSink::new(Vec::new(), true);
        sink.emit(SemanticEvent::Axis {
            name: "Crossbar-X",
            value: 0,
        })
        .expect("emit");

        let text = String::from_utf8(sink.into_inner()).expect("utf8");
        let (stamp, rest) = text.split_once(' ').expect("prefix");
        assert_eq!(stamp.len(), "00:00:00.000".len());
        assert_eq!(rest, "Crossbar-X value 0\n");
    }

    #[tokio::test]
    async fn channel_sink_forwards_and_detects_closed_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let worker = std::thread::spawn(move || {
            let mut sink = ChannelSink::new(tx);
            sink.emit(SemanticEvent::Axis {
                name: "Left Stick-X",
                value: 100,
            })
        });

        assert_eq!(
            rx.recv().await,
            Some(SemanticEvent::Axis {
                name: "Left Stick-X",
                value: 100
            })
        );
        assert!(worker.join().expect("worker").is_ok());

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = std::thread::spawn(move || {
            ChannelSink::new(tx).emit(SemanticEvent::Axis {
                name: "Left Stick-X",
                value: 0,
            })
        })
        .join()
        .expect("worker");
        assert!(matches!(result, Err(SinkError::ChannelClosed)));
    }
}
