//! Compiled-in controller profiles
//!
//! A profile pairs the exact name a device reports with static tables that
//! give each button and axis index a display name. Adding a controller means
//! adding a new profile constant and registering it in [`PROFILES`]; the decode
//! logic never changes.

/// Declared value range of an axis. Descriptive only, never applied to values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub low: i16,
    pub high: i16,
    pub mid: i16,
    /// Value reported while the control is untouched
    pub rest: i16,
}

impl AxisRange {
    pub const fn new(low: i16, high: i16, mid: i16, rest: i16) -> Self {
        Self {
            low,
            high,
            mid,
            rest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSpec {
    pub index: u8,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpec {
    pub index: u8,
    pub name: &'static str,
    pub range: AxisRange,
}

/// Immutable description of one hardware model
#[derive(Debug, PartialEq, Eq)]
pub struct ControllerProfile {
    /// Short identifier used in configuration files
    pub key: &'static str,
    /// Exact name the device reports through the name query
    pub signature: &'static str,
    pub button_count: u8,
    pub axis_count: u8,
    pub buttons: &'static [ButtonSpec],
    pub axes: &'static [AxisSpec],
}

impl ControllerProfile {
    pub fn matches(&self, reported_name: &str) -> bool {
        self.signature == reported_name
    }

    /// Display name of a button, or `None` if the table has no entry for it
    pub fn lookup_button(&self, index: u8) -> Option<&'static str> {
        self.buttons
            .iter()
            .find(|spec| spec.index == index)
            .map(|spec| spec.name)
    }

    pub fn lookup_axis(&self, index: u8) -> Option<&'static AxisSpec> {
        self.axes.iter().find(|spec| spec.index == index)
    }
}

/// Button layout of the Logitech F710 in XInput mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogitechF710Button {
    A,
    B,
    X,
    Y,
    LeftTrigger,
    RightTrigger,
    Back,
    Start,
    Mode,
    LeftStick,
    RightStick,
}

impl LogitechF710Button {
    pub const COUNT: u8 = LogitechF710Button::RightStick as u8 + 1;
}

/// Axis layout of the Logitech F710 in XInput mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogitechF710Axis {
    LeftStickX,
    LeftStickY,
    LeftTrigger,
    RightStickX,
    RightStickY,
    RightTrigger,
    // The crossbar only ever reports low, mid or high
    CrossbarX,
    CrossbarY,
}

impl LogitechF710Axis {
    pub const COUNT: u8 = LogitechF710Axis::CrossbarY as u8 + 1;
}

const STICK: AxisRange = AxisRange::new(-32767, 32767, 0, 0);
const TRIGGER: AxisRange = AxisRange::new(-32767, 32767, 0, -32767);

const F710_BUTTONS: &[ButtonSpec] = &[
    ButtonSpec { index: LogitechF710Button::A as u8, name: "A - Green" },
    ButtonSpec { index: LogitechF710Button::B as u8, name: "B - Red" },
    ButtonSpec { index: LogitechF710Button::X as u8, name: "X - Blue" },
    ButtonSpec { index: LogitechF710Button::Y as u8, name: "Y - Yellow" },
    ButtonSpec { index: LogitechF710Button::LeftTrigger as u8, name: "Left Trigger" },
    ButtonSpec { index: LogitechF710Button::RightTrigger as u8, name: "Right Trigger" },
    ButtonSpec { index: LogitechF710Button::Back as u8, name: "Back" },
    ButtonSpec { index: LogitechF710Button::Start as u8, name: "Start" },
    ButtonSpec { index: LogitechF710Button::Mode as u8, name: "Mode" },
    ButtonSpec { index: LogitechF710Button::LeftStick as u8, name: "Left Stick" },
    ButtonSpec { index: LogitechF710Button::RightStick as u8, name: "Right Stick" },
];

const F710_AXES: &[AxisSpec] = &[
    AxisSpec { index: LogitechF710Axis::LeftStickX as u8, name: "Left Stick-X", range: STICK },
    AxisSpec { index: LogitechF710Axis::LeftStickY as u8, name: "Left Stick-Y", range: STICK },
    AxisSpec { index: LogitechF710Axis::LeftTrigger as u8, name: "Left Trigger", range: TRIGGER },
    AxisSpec { index: LogitechF710Axis::RightStickX as u8, name: "Right Stick-X", range: STICK },
    AxisSpec { index: LogitechF710Axis::RightStickY as u8, name: "Right Stick-Y", range: STICK },
    AxisSpec { index: LogitechF710Axis::RightTrigger as u8, name: "Right Trigger", range: TRIGGER },
    AxisSpec { index: LogitechF710Axis::CrossbarX as u8, name: "Crossbar-X", range: STICK },
    AxisSpec { index: LogitechF710Axis::CrossbarY as u8, name: "Crossbar-Y", range: STICK },
];

pub static LOGITECH_F710: ControllerProfile = ControllerProfile {
    key: "logitech-f710",
    signature: "Logitech Gamepad F710",
    button_count: LogitechF710Button::COUNT,
    axis_count: LogitechF710Axis::COUNT,
    buttons: F710_BUTTONS,
    axes: F710_AXES,
};

/// Every profile shipped with the binary
pub static PROFILES: &[&ControllerProfile] = &[&LOGITECH_F710];

/// Picks the profile whose signature equals the name a device reported
pub fn find_by_signature(reported_name: &str) -> Option<&'static ControllerProfile> {
    PROFILES
        .iter()
        .copied()
        .find(|profile| profile.matches(reported_name))
}

pub fn find_by_key(key: &str) -> Option<&'static ControllerProfile> {
    PROFILES.iter().copied().find(|profile| profile.key == key)
}
