//! In-memory backend with scriptable devices.
//!
//! Used by the test-suite and by the monitor binary on platforms without
//! XInput. Every slot starts absent; callers plug pads in, change their state,
//! pull them out or make their queries fail.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::controller::backend::{BackendError, GamepadBackend};
use crate::controller::state::{BatteryInfo, GamepadState, RawGamepadState, MAX_DEVICES};

/// One recorded `set_vibration` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibrationCommand {
    pub index: usize,
    pub soft: u16,
    pub hard: u16,
}

#[derive(Debug, Clone, Copy)]
enum PadResponse {
    Absent,
    Failing(u32),
    Present(RawGamepadState),
}

#[derive(Debug, Clone, Copy)]
struct SimulatedPad {
    response: PadResponse,
    battery: Option<BatteryInfo>,
    queries: usize,
}

impl Default for SimulatedPad {
    fn default() -> Self {
        Self {
            response: PadResponse::Absent,
            battery: None,
            queries: 0,
        }
    }
}

#[derive(Debug, Default)]
struct SimulatedDevices {
    pads: [SimulatedPad; MAX_DEVICES],
    vibrations: Vec<VibrationCommand>,
}

#[derive(Debug, Default)]
pub struct SimulatedBackend {
    devices: Mutex<SimulatedDevices>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn devices(&self) -> MutexGuard<'_, SimulatedDevices> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_pad<R>(&self, index: usize, f: impl FnOnce(&mut SimulatedPad) -> R) -> Option<R> {
        self.devices().pads.get_mut(index).map(f)
    }

    /// Plugs in (or updates) the pad at `index` with `gamepad`.
    pub fn set_state(&self, index: usize, gamepad: GamepadState) {
        self.with_pad(index, |pad| {
            let packet_number = match pad.response {
                PadResponse::Present(raw) => raw.packet_number.wrapping_add(1),
                _ => 0,
            };
            pad.response = PadResponse::Present(RawGamepadState {
                connected: true,
                packet_number,
                gamepad,
            });
        });
    }

    /// Driver answers successfully but reports the slot as empty.
    pub fn set_empty(&self, index: usize) {
        self.with_pad(index, |pad| {
            pad.response = PadResponse::Present(RawGamepadState::default());
        });
    }

    pub fn unplug(&self, index: usize) {
        self.with_pad(index, |pad| pad.response = PadResponse::Absent);
    }

    /// Makes every query of `index` fail with `code`.
    pub fn fail(&self, index: usize, code: u32) {
        self.with_pad(index, |pad| pad.response = PadResponse::Failing(code));
    }

    pub fn set_battery(&self, index: usize, battery: Option<BatteryInfo>) {
        self.with_pad(index, |pad| pad.battery = battery);
    }

    /// How many times `index` has been queried.
    pub fn query_count(&self, index: usize) -> usize {
        self.with_pad(index, |pad| pad.queries).unwrap_or(0)
    }

    pub fn vibrations(&self) -> Vec<VibrationCommand> {
        self.devices().vibrations.clone()
    }
}

impl GamepadBackend for SimulatedBackend {
    fn query(&self, index: usize) -> Result<RawGamepadState, BackendError> {
        let mut devices = self.devices();
        let pad = devices
            .pads
            .get_mut(index)
            .ok_or(BackendError::NotConnected)?;
        pad.queries += 1;

        match pad.response {
            PadResponse::Absent => Err(BackendError::NotConnected),
            PadResponse::Failing(code) => Err(BackendError::Device { code }),
            PadResponse::Present(raw) => Ok(raw),
        }
    }

    fn set_vibration(&self, index: usize, soft: u16, hard: u16) -> Result<(), BackendError> {
        let mut devices = self.devices();
        match devices.pads.get(index).map(|pad| pad.response) {
            Some(PadResponse::Present(raw)) if raw.connected => {
                devices.vibrations.push(VibrationCommand { index, soft, hard });
                Ok(())
            }
            _ => Err(BackendError::NotConnected),
        }
    }

    fn query_battery(&self, index: usize) -> Result<BatteryInfo, BackendError> {
        self.with_pad(index, |pad| pad.battery)
            .flatten()
            .ok_or(BackendError::Unsupported("battery information"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::state::Button;

    #[test]
    fn absent_slots_fail_queries() {
        let backend = SimulatedBackend::new();
        assert!(matches!(backend.query(0), Err(BackendError::NotConnected)));
        assert!(matches!(backend.query(9), Err(BackendError::NotConnected)));
        assert_eq!(backend.query_count(0), 1);
    }

    #[test]
    fn state_updates_bump_packet_number() {
        let backend = SimulatedBackend::new();
        backend.set_state(1, GamepadState::default());
        backend.set_state(1, GamepadState::default().with_button(Button::B));

        let raw = backend.query(1).expect("pad present");
        assert!(raw.connected);
        assert_eq!(raw.packet_number, 1);
        assert!(raw.gamepad.is_pressed(Button::B));
    }

    #[test]
    fn failing_pad_reports_code() {
        let backend = SimulatedBackend::new();
        backend.fail(2, 1167);
        assert!(matches!(
            backend.query(2),
            Err(BackendError::Device { code: 1167 })
        ));
    }

    #[test]
    fn vibration_requires_connected_pad() {
        let backend = SimulatedBackend::new();
        assert!(backend.set_vibration(0, 1, 2).is_err());

        backend.set_state(0, GamepadState::default());
        backend.set_vibration(0, 1, 2).expect("connected");
        assert_eq!(
            backend.vibrations(),
            vec![VibrationCommand {
                index: 0,
                soft: 1,
                hard: 2
            }]
        );
    }
}
