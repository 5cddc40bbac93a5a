//! Hardware capability used by the poller and the command surface.
//!
//! A backend is shared between the poller thread (reads) and the consumer
//! thread (rumble and battery queries), so implementations must be
//! `Send + Sync`. Calls are expected to return quickly; nothing here retries.

use crate::controller::state::{BatteryInfo, RawGamepadState};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Device is not connected")]
    NotConnected,

    #[error("Device query failed with code {code}")]
    Device { code: u32 },

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

pub trait GamepadBackend: Send + Sync {
    /// Reads the current state of `index`.
    ///
    /// Any `Err` is treated by the poller as "not connected".
    fn query(&self, index: usize) -> Result<RawGamepadState, BackendError>;

    /// Sets motor speeds in the hardware's native `0..=u16::MAX` range.
    fn set_vibration(&self, index: usize, soft: u16, hard: u16) -> Result<(), BackendError>;

    fn query_battery(&self, index: usize) -> Result<BatteryInfo, BackendError>;
}
