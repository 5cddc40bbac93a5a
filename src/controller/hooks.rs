//! Host-side hook registry.
//!
//! Hosts register callbacks under the hook names produced by
//! [`InputKind::hook_name`](crate::controller::event_collector::InputKind::hook_name).
//! The registry implements [`EventHandler`], so it can be passed straight to
//! [`EventProcessor::drain`](crate::controller::event_processor::EventProcessor::drain).

use std::collections::BTreeMap;

use crate::controller::event_processor::{DispatchedEvent, EventHandler, HookFailure};

/// Every hook name the dispatcher can call.
pub const HOOK_NAMES: [&str; 6] = [
    "xinputConnected",
    "xinputDisconnected",
    "xinputPressed",
    "xinputReleased",
    "xinputTrigger",
    "xinputStick",
];

type HookFn = Box<dyn FnMut(&DispatchedEvent) -> Result<(), HookFailure>>;

struct HookEntry {
    hook: String,
    callback: HookFn,
    enabled: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown hook \"{0}\"")]
pub struct UnknownHook(pub String);

#[derive(Default)]
pub struct HookRegistry {
    next_id: u64,
    // Keyed by id, so iteration follows registration order.
    entries: BTreeMap<u64, HookEntry>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `hook` and returns its id.
    pub fn add(
        &mut self,
        hook: &str,
        callback: impl FnMut(&DispatchedEvent) -> Result<(), HookFailure> + 'static,
    ) -> Result<u64, UnknownHook> {
        if !HOOK_NAMES.contains(&hook) {
            return Err(UnknownHook(hook.to_string()));
        }

        let id = self.next_id;
        self.entries.insert(
            id,
            HookEntry {
                hook: hook.to_string(),
                callback: Box::new(callback),
                enabled: true,
            },
        );
        self.next_id += 1;
        Ok(id)
    }

    pub fn remove(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Mutes a callback without removing it.
    pub fn set_enabled(&mut self, id: u64, enabled: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.enabled = enabled;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventHandler for HookRegistry {
    /// Runs every enabled callback registered for the event's hook.
    ///
    /// Stops at the first failing callback.
    fn handle(&mut self, event: &DispatchedEvent) -> Result<(), HookFailure> {
        let hook = event.hook_name();
        for entry in self.entries.values_mut() {
            if entry.enabled && entry.hook == hook {
                (entry.callback)(event)?;
            }
        }
        Ok(())
    }
}
