//! Controller subsystem: polling, event queue and dispatch
//!
//! Implements a two-thread pipeline:
//!
//! 1. [`event_collector`] - Poller thread sampling every slot and diffing states
//! 2. [`event_processor`] - Consumer-side drain with clock correlation
//! 3. [`controller_handle`] - Session lifecycle and the [`commands`] surface
//!
//! # Architecture
//!
//! ```text
//! GamepadBackend ──► Poller ──► [slots + queue] ──► Dispatcher ──► hooks
//!                               (one Mutex)    └──► Commands
//! ```
//!
//! The poller holds the shared lock for a whole cycle; the consumer holds it
//! only to copy a slot or swap the queue out.

pub mod backend;
pub mod commands;
pub mod controller_handle;
pub mod event_collector;
pub mod event_processor;
pub mod hooks;
pub mod shared;
pub mod simulated;
pub mod state;
#[cfg(target_os = "windows")]
pub mod xinput;

pub use backend::{BackendError, GamepadBackend};
pub use commands::{BatteryReading, BatteryUnavailable, CommandError, Commands};
pub use controller_handle::{ControllerError, ControllerHandle};
pub use event_collector::{InputEvent, InputKind};
pub use event_processor::{
    DispatchError, DispatchedEvent, EventHandler, HookFailure, HostClock, SessionClock, WallClock,
};
pub use hooks::HookRegistry;
pub use state::{BatteryInfo, BatteryLevel, BatteryType, Button, GamepadState, Side, MAX_DEVICES};
