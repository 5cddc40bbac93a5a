#![cfg(target_os = "windows")]

//! Windows XInput backend.
//!
//! XInput exposes up to four controller slots. `XInputGetState` returns
//! `ERROR_SUCCESS` for a present pad and `ERROR_DEVICE_NOT_CONNECTED` for an
//! empty slot; every other code is reported as [`BackendError::Device`].
//! The FFI calls are stateless, so a single `XInputBackend` can be shared by
//! the poller and the consumer thread.

use windows_sys::Win32::Foundation::{ERROR_DEVICE_NOT_CONNECTED, ERROR_SUCCESS};
use windows_sys::Win32::UI::Input::XboxController::*;

use crate::controller::backend::{BackendError, GamepadBackend};
use crate::controller::state::{
    BatteryInfo, BatteryLevel, BatteryType, GamepadState, RawGamepadState, MAX_DEVICES,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct XInputBackend;

impl XInputBackend {
    pub fn new() -> Self {
        Self
    }

    fn slot(index: usize) -> Result<u32, BackendError> {
        if index < MAX_DEVICES {
            Ok(index as u32)
        } else {
            Err(BackendError::NotConnected)
        }
    }

    fn check(code: u32) -> Result<(), BackendError> {
        match code {
            ERROR_SUCCESS => Ok(()),
            ERROR_DEVICE_NOT_CONNECTED => Err(BackendError::NotConnected),
            code => Err(BackendError::Device { code }),
        }
    }
}

impl GamepadBackend for XInputBackend {
    fn query(&self, index: usize) -> Result<RawGamepadState, BackendError> {
        let slot = Self::slot(index)?;

        // FFI struct: must be manually zeroed
        let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
        Self::check(unsafe { XInputGetState(slot, &mut state) })?;

        let gp = state.Gamepad;
        Ok(RawGamepadState {
            connected: true,
            packet_number: state.dwPacketNumber,
            gamepad: GamepadState {
                buttons: gp.wButtons,
                left_trigger: gp.bLeftTrigger,
                right_trigger: gp.bRightTrigger,
                thumb_lx: gp.sThumbLX,
                thumb_ly: gp.sThumbLY,
                thumb_rx: gp.sThumbRX,
                thumb_ry: gp.sThumbRY,
            },
        })
    }

    fn set_vibration(&self, index: usize, soft: u16, hard: u16) -> Result<(), BackendError> {
        let slot = Self::slot(index)?;
        // Left motor is the low-frequency (soft) one.
        let vibration = XINPUT_VIBRATION {
            wLeftMotorSpeed: soft,
            wRightMotorSpeed: hard,
        };
        Self::check(unsafe { XInputSetState(slot, &vibration) })
    }

    fn query_battery(&self, index: usize) -> Result<BatteryInfo, BackendError> {
        let slot = Self::slot(index)?;

        let mut info: XINPUT_BATTERY_INFORMATION = unsafe { std::mem::zeroed() };
        Self::check(unsafe {
            XInputGetBatteryInformation(slot, BATTERY_DEVTYPE_GAMEPAD, &mut info)
        })?;

        let battery_type = match info.BatteryType {
            BATTERY_TYPE_DISCONNECTED => BatteryType::Disconnected,
            BATTERY_TYPE_WIRED => BatteryType::Wired,
            BATTERY_TYPE_ALKALINE => BatteryType::Alkaline,
            BATTERY_TYPE_NIMH => BatteryType::Nimh,
            _ => BatteryType::Unknown,
        };
        let level = match info.BatteryLevel {
            BATTERY_LEVEL_EMPTY => BatteryLevel::Empty,
            BATTERY_LEVEL_LOW => BatteryLevel::Low,
            BATTERY_LEVEL_MEDIUM => BatteryLevel::Medium,
            _ => BatteryLevel::Full,
        };

        Ok(BatteryInfo {
            battery_type,
            level,
        })
    }
}
