//! Background gamepad polling with a cross-thread event queue.
//!
//! A poller thread samples up to four controllers, turns state changes into
//! [`InputEvent`]s and queues them; the host drains the queue on its own tick
//! and receives each event through a hook, with timestamps translated into the
//! host's clock.

pub mod config;
pub mod controller;

pub use config::{ConfigError, RelaySettings};
pub use controller::*;
