//! Point-in-time queries and rumble control for the consumer thread.
//!
//! Reads copy one slot out of the shared table under the lock; hardware calls
//! (battery, vibration) run after the lock has been released. Every entry point
//! validates the controller index first.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::controller::backend::GamepadBackend;
use crate::controller::shared::SharedState;
use crate::controller::state::{
    BatteryType, Button, DeviceSlot, GamepadState, Side, MAX_DEVICES,
};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid controller index {index} (must be between 0 and {max} inclusive)")]
    InvalidDevice { index: usize, max: usize },
}

/// Why no battery level could be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryUnavailable {
    NotConnected,
    QueryFailed,
    /// The driver reports no battery attached.
    Disconnected,
    Wired,
    UnknownType,
}

impl BatteryUnavailable {
    pub const fn message(self) -> &'static str {
        match self {
            BatteryUnavailable::NotConnected => "controller is not connected",
            BatteryUnavailable::QueryFailed => "error retrieving battery information",
            BatteryUnavailable::Disconnected => "controller is disconnected",
            BatteryUnavailable::Wired => "controller is wired and does not have a battery level",
            BatteryUnavailable::UnknownType => "controller has unknown battery type",
        }
    }
}

impl fmt::Display for BatteryUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryReading {
    /// Charge in `[0.0, 1.0]`.
    Level(f64),
    Unavailable(BatteryUnavailable),
}

/// Validates `index` against the slot table.
pub fn check_device(index: usize) -> Result<usize, CommandError> {
    if index < MAX_DEVICES {
        Ok(index)
    } else {
        Err(CommandError::InvalidDevice {
            index,
            max: MAX_DEVICES - 1,
        })
    }
}

/// Maps a rumble intensity onto the motor's native range, clamping to `[0, 1]`.
fn motor_speed(intensity: f64) -> u16 {
    if intensity.is_nan() {
        return 0;
    }
    (intensity.clamp(0.0, 1.0) * f64::from(u16::MAX)) as u16
}

#[derive(Clone)]
pub struct Commands {
    shared: Arc<SharedState>,
    backend: Arc<dyn GamepadBackend>,
}

impl Commands {
    pub fn new(shared: Arc<SharedState>, backend: Arc<dyn GamepadBackend>) -> Self {
        Self { shared, backend }
    }

    fn slot(&self, index: usize) -> Result<DeviceSlot, CommandError> {
        let index = check_device(index)?;
        Ok(self.shared.slot(index).unwrap_or_default())
    }

    /// Full gamepad state, or `None` when the controller is not connected.
    pub fn get_state(&self, index: usize) -> Result<Option<GamepadState>, CommandError> {
        let slot = self.slot(index)?;
        Ok(slot.connected.then_some(slot.gamepad))
    }

    /// Whether any recognized button in `mask` is held.
    pub fn get_button(&self, index: usize, mask: u16) -> Result<bool, CommandError> {
        let slot = self.slot(index)?;
        Ok(slot.gamepad.buttons & mask & Button::RECOGNIZED_MASK != 0)
    }

    pub fn get_named_button(&self, index: usize, button: Button) -> Result<bool, CommandError> {
        self.get_button(index, button.mask())
    }

    pub fn get_trigger(&self, index: usize, side: Side) -> Result<u8, CommandError> {
        Ok(self.slot(index)?.gamepad.trigger(side))
    }

    pub fn get_stick(&self, index: usize, side: Side) -> Result<(i16, i16), CommandError> {
        Ok(self.slot(index)?.gamepad.stick(side))
    }

    pub fn get_battery_level(&self, index: usize) -> Result<BatteryReading, CommandError> {
        if !self.slot(index)?.connected {
            return Ok(BatteryReading::Unavailable(BatteryUnavailable::NotConnected));
        }

        let info = match self.backend.query_battery(index) {
            Ok(info) => info,
            Err(e) => {
                debug!("Battery query for controller {} failed: {}", index, e);
                return Ok(BatteryReading::Unavailable(BatteryUnavailable::QueryFailed));
            }
        };

        let reading = match info.battery_type {
            BatteryType::Disconnected => {
                BatteryReading::Unavailable(BatteryUnavailable::Disconnected)
            }
            BatteryType::Wired => BatteryReading::Unavailable(BatteryUnavailable::Wired),
            BatteryType::Unknown => BatteryReading::Unavailable(BatteryUnavailable::UnknownType),
            BatteryType::Alkaline | BatteryType::Nimh => {
                BatteryReading::Level(info.level.fraction())
            }
        };
        Ok(reading)
    }

    /// Indices of every connected controller, ascending.
    pub fn get_controllers(&self) -> Vec<usize> {
        let table = self.shared.lock();
        table
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.connected)
            .map(|(index, _)| index)
            .collect()
    }

    /// Drives both motors; silently ignored when the controller is not connected.
    pub fn set_rumble(&self, index: usize, soft: f64, hard: f64) -> Result<(), CommandError> {
        if !self.slot(index)?.connected {
            return Ok(());
        }

        let (soft, hard) = (motor_speed(soft), motor_speed(hard));
        if let Err(e) = self.backend.set_vibration(index, soft, hard) {
            warn!("Failed to set rumble on controller {}: {}", index, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::event_collector::poll_devices;
    use crate::controller::simulated::{SimulatedBackend, VibrationCommand};
    use crate::controller::state::{BatteryInfo, BatteryLevel};
    use std::time::{Duration, Instant};

    fn setup() -> (Commands, Arc<SimulatedBackend>, Arc<SharedState>) {
        let shared = Arc::new(SharedState::default());
        let backend = Arc::new(SimulatedBackend::new());
        let commands = Commands::new(shared.clone(), backend.clone());
        (commands, backend, shared)
    }

    fn poll(shared: &SharedState, backend: &SimulatedBackend) {
        let mut table = shared.lock();
        poll_devices(&mut table, backend, Instant::now(), Duration::from_secs(4));
    }

    #[test]
    fn out_of_range_index_is_a_usage_error() {
        let (commands, _, _) = setup();
        let expected = CommandError::InvalidDevice { index: 4, max: 3 };

        assert_eq!(commands.get_state(4), Err(expected.clone()));
        assert_eq!(commands.get_button(4, Button::A.mask()), Err(expected.clone()));
        assert_eq!(commands.get_trigger(4, Side::Left), Err(expected.clone()));
        assert_eq!(commands.get_stick(4, Side::Left), Err(expected.clone()));
        assert_eq!(commands.get_battery_level(4), Err(expected.clone()));
        assert_eq!(commands.set_rumble(4, 1.0, 1.0), Err(expected.clone()));
        assert_eq!(
            expected.to_string(),
            "invalid controller index 4 (must be between 0 and 3 inclusive)"
        );
    }

    #[test]
    fn queries_read_the_last_polled_state() {
        let (commands, backend, shared) = setup();
        let gamepad = GamepadState::default()
            .with_button(Button::X)
            .with_trigger(Side::Right, 77)
            .with_stick(Side::Left, -1000, 2000);
        backend.set_state(1, gamepad);

        // Not polled yet
        assert_eq!(commands.get_state(1), Ok(None));

        poll(&shared, &backend);
        assert_eq!(commands.get_state(1), Ok(Some(gamepad)));
        assert_eq!(commands.get_named_button(1, Button::X), Ok(true));
        assert_eq!(commands.get_named_button(1, Button::Y), Ok(false));
        assert_eq!(commands.get_trigger(1, Side::Right), Ok(77));
        assert_eq!(commands.get_trigger(1, Side::Left), Ok(0));
        assert_eq!(commands.get_stick(1, Side::Left), Ok((-1000, 2000)));
        assert_eq!(commands.get_controllers(), vec![1]);
    }

    #[test]
    fn unrecognized_button_mask_reads_false() {
        let (commands, backend, shared) = setup();
        backend.set_state(
            0,
            GamepadState {
                buttons: 0x0400 | Button::A.mask(),
                ..GamepadState::default()
            },
        );
        poll(&shared, &backend);

        assert_eq!(commands.get_button(0, 0x0400), Ok(false));
        assert_eq!(commands.get_button(0, 0x0000), Ok(false));
        assert_eq!(commands.get_button(0, Button::A.mask()), Ok(true));
    }

    #[test]
    fn battery_reasons_are_distinguishable() {
        let (commands, backend, shared) = setup();
        assert_eq!(
            commands.get_battery_level(0),
            Ok(BatteryReading::Unavailable(BatteryUnavailable::NotConnected))
        );

        backend.set_state(0, GamepadState::default());
        poll(&shared, &backend);
        assert_eq!(
            commands.get_battery_level(0),
            Ok(BatteryReading::Unavailable(BatteryUnavailable::QueryFailed))
        );

        let cases = [
            (BatteryType::Wired, BatteryUnavailable::Wired),
            (BatteryType::Disconnected, BatteryUnavailable::Disconnected),
            (BatteryType::Unknown, BatteryUnavailable::UnknownType),
        ];
        for (battery_type, reason) in cases {
            backend.set_battery(
                0,
                Some(BatteryInfo {
                    battery_type,
                    level: BatteryLevel::Full,
                }),
            );
            assert_eq!(
                commands.get_battery_level(0),
                Ok(BatteryReading::Unavailable(reason))
            );
        }
        assert_eq!(
            BatteryUnavailable::Wired.to_string(),
            "controller is wired and does not have a battery level"
        );
    }

    #[test]
    fn battery_level_is_normalized() {
        let (commands, backend, shared) = setup();
        backend.set_state(2, GamepadState::default());
        backend.set_battery(
            2,
            Some(BatteryInfo {
                battery_type: BatteryType::Nimh,
                level: BatteryLevel::Medium,
            }),
        );
        poll(&shared, &backend);

        match commands.get_battery_level(2) {
            Ok(BatteryReading::Level(level)) => assert!((level - 2.0 / 3.0).abs() < 1e-12),
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn rumble_is_clamped_and_scaled() {
        let (commands, backend, shared) = setup();
        backend.set_state(0, GamepadState::default());
        poll(&shared, &backend);

        commands.set_rumble(0, 1.5, -0.5).expect("valid index");
        commands.set_rumble(0, 0.5, f64::NAN).expect("valid index");
        assert_eq!(
            backend.vibrations(),
            vec![
                VibrationCommand {
                    index: 0,
                    soft: u16::MAX,
                    hard: 0
                },
                VibrationCommand {
                    index: 0,
                    soft: 32767,
                    hard: 0
                },
            ]
        );
    }

    #[test]
    fn rumble_on_disconnected_controller_is_a_no_op() {
        let (commands, backend, _) = setup();
        // Present in hardware but never polled, so still disconnected in the table.
        backend.set_state(3, GamepadState::default());

        assert_eq!(commands.set_rumble(3, 1.0, 1.0), Ok(()));
        assert!(backend.vibrations().is_empty());
    }
}
