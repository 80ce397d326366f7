//! Joystick-API controller monitor
//!
//! Reads raw reports from a joystick device node, names each button and axis
//! through a compiled-in controller profile and forwards the result to an
//! [`EventSink`](controller::EventSink).

pub mod config;
pub mod controller;
pub mod logging;
