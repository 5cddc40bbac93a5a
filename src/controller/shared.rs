//! State shared between the poller thread and the consumer thread.
//!
//! Slots, backoff deadlines, the event queue and the running flag all live in
//! one [`PadTable`] behind a single mutex. The poller holds the lock for a
//! whole cycle, so readers only ever observe completed cycles.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::controller::event_collector::InputEvent;
use crate::controller::state::{DeviceSlot, MAX_DEVICES};

#[derive(Debug, Default)]
pub struct PadTable {
    pub slots: [DeviceSlot; MAX_DEVICES],
    /// Earliest time a disconnected slot may be queried again; `None` means now.
    pub next_poll_at: [Option<Instant>; MAX_DEVICES],
    pub events: VecDeque<InputEvent>,
    pub running: bool,
}

impl PadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every queued event, oldest first, leaving the queue empty.
    pub fn take_events(&mut self) -> VecDeque<InputEvent> {
        std::mem::take(&mut self.events)
    }
}

#[derive(Debug, Default)]
pub struct SharedState {
    table: Mutex<PadTable>,
}

impl SharedState {
    pub fn new(table: PadTable) -> Self {
        Self {
            table: Mutex::new(table),
        }
    }

    /// Locks the table.
    ///
    /// The poller commits a cycle only after every slot has been sampled, so a
    /// guard recovered from a poisoned lock still sees the last complete cycle.
    pub fn lock(&self) -> MutexGuard<'_, PadTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn slot(&self, index: usize) -> Option<DeviceSlot> {
        self.lock().slots.get(index).copied()
    }

    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    pub fn take_events(&self) -> VecDeque<InputEvent> {
        self.lock().take_events()
    }

    pub fn queued_events(&self) -> usize {
        self.lock().events.len()
    }
}
