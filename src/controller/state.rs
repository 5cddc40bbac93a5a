//! Device state types shared by the poller, the dispatcher and the command surface.
//!
//! Values mirror the XInput gamepad layout: a 16-bit button bitset, two 8-bit
//! triggers and four signed 16-bit thumbstick axes.

use serde::{Deserialize, Serialize};

/// Number of controller slots the hardware exposes.
pub const MAX_DEVICES: usize = 4;

/// Recognized gamepad buttons.
///
/// Declaration order is the order in which simultaneous button edges are
/// emitted by the poller, independent of bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    Start,
    Back,
    LeftThumb,
    RightThumb,
    LeftShoulder,
    RightShoulder,
    A,
    B,
    X,
    Y,
}

impl Button {
    /// All recognized buttons in emission order.
    pub const ALL: [Button; 14] = [
        Button::DPadUp,
        Button::DPadDown,
        Button::DPadLeft,
        Button::DPadRight,
        Button::Start,
        Button::Back,
        Button::LeftThumb,
        Button::RightThumb,
        Button::LeftShoulder,
        Button::RightShoulder,
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
    ];

    /// Union of every recognized button bit.
    pub const RECOGNIZED_MASK: u16 = 0xF3FF;

    /// Bit of this button inside [`GamepadState::buttons`].
    pub const fn mask(self) -> u16 {
        match self {
            Button::DPadUp => 0x0001,
            Button::DPadDown => 0x0002,
            Button::DPadLeft => 0x0004,
            Button::DPadRight => 0x0008,
            Button::Start => 0x0010,
            Button::Back => 0x0020,
            Button::LeftThumb => 0x0040,
            Button::RightThumb => 0x0080,
            Button::LeftShoulder => 0x0100,
            Button::RightShoulder => 0x0200,
            Button::A => 0x1000,
            Button::B => 0x2000,
            Button::X => 0x4000,
            Button::Y => 0x8000,
        }
    }

    /// Looks up the button owning exactly `mask`.
    pub fn from_mask(mask: u16) -> Option<Button> {
        Button::ALL.into_iter().find(|b| b.mask() == mask)
    }

    /// Constant name hosts use when exporting the bitmask.
    pub const fn name(self) -> &'static str {
        match self {
            Button::DPadUp => "XINPUT_GAMEPAD_DPAD_UP",
            Button::DPadDown => "XINPUT_GAMEPAD_DPAD_DOWN",
            Button::DPadLeft => "XINPUT_GAMEPAD_DPAD_LEFT",
            Button::DPadRight => "XINPUT_GAMEPAD_DPAD_RIGHT",
            Button::Start => "XINPUT_GAMEPAD_START",
            Button::Back => "XINPUT_GAMEPAD_BACK",
            Button::LeftThumb => "XINPUT_GAMEPAD_LEFT_THUMB",
            Button::RightThumb => "XINPUT_GAMEPAD_RIGHT_THUMB",
            Button::LeftShoulder => "XINPUT_GAMEPAD_LEFT_SHOULDER",
            Button::RightShoulder => "XINPUT_GAMEPAD_RIGHT_SHOULDER",
            Button::A => "XINPUT_GAMEPAD_A",
            Button::B => "XINPUT_GAMEPAD_B",
            Button::X => "XINPUT_GAMEPAD_X",
            Button::Y => "XINPUT_GAMEPAD_Y",
        }
    }
}

/// Which trigger or thumbstick an analog value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Host-facing index (0 is left).
    pub const fn index(self) -> u8 {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Digital and analog state of one gamepad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamepadState {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl GamepadState {
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn trigger(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left_trigger,
            Side::Right => self.right_trigger,
        }
    }

    pub fn stick(&self, side: Side) -> (i16, i16) {
        match side {
            Side::Left => (self.thumb_lx, self.thumb_ly),
            Side::Right => (self.thumb_rx, self.thumb_ry),
        }
    }

    // Builder helpers, mostly for backends that synthesize state.

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons |= button.mask();
        self
    }

    pub fn with_trigger(mut self, side: Side, value: u8) -> Self {
        match side {
            Side::Left => self.left_trigger = value,
            Side::Right => self.right_trigger = value,
        }
        self
    }

    pub fn with_stick(mut self, side: Side, x: i16, y: i16) -> Self {
        match side {
            Side::Left => {
                self.thumb_lx = x;
                self.thumb_ly = y;
            }
            Side::Right => {
                self.thumb_rx = x;
                self.thumb_ry = y;
            }
        }
        self
    }
}

/// Result of a successful hardware query.
///
/// `connected` may still be false when the driver answers for an empty slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawGamepadState {
    pub connected: bool,
    /// Driver sequence number; bumps whenever the device reports new input.
    pub packet_number: u32,
    pub gamepad: GamepadState,
}

/// Last-known state of one controller slot.
///
/// Only the poller writes it, always as a whole value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSlot {
    pub connected: bool,
    /// Packet number of the sample stored in `gamepad`.
    pub packet_number: u32,
    pub gamepad: GamepadState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryType {
    Disconnected,
    Wired,
    Alkaline,
    Nimh,
    Unknown,
}

/// Coarse charge level as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BatteryLevel {
    Empty,
    Low,
    Medium,
    Full,
}

impl BatteryLevel {
    pub const fn raw(self) -> u8 {
        match self {
            BatteryLevel::Empty => 0,
            BatteryLevel::Low => 1,
            BatteryLevel::Medium => 2,
            BatteryLevel::Full => 3,
        }
    }

    /// Level mapped onto `[0.0, 1.0]`.
    pub fn fraction(self) -> f64 {
        f64::from(self.raw()) / f64::from(BatteryLevel::Full.raw())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryInfo {
    pub battery_type: BatteryType,
    pub level: BatteryLevel,
}
