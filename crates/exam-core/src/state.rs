use std::cell::Cell;
use std::time::Instant;

/// Flags shared by the session guard and the violation monitor. Single-threaded.
#[derive(Debug, Default)]
pub struct MonitorState {
    intentional_unload: Cell<bool>,
    completed: Cell<bool>,
    last_visibility_change_at: Cell<Option<Instant>>,
    last_heartbeat_at: Cell<Option<Instant>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_intentional_unload(&self) -> bool {
        self.intentional_unload.get()
    }

    /// Marks the next unload as system-initiated. Only the safe-submit path,
    /// violation handling and the refresh redirect set this.
    pub fn mark_intentional_unload(&self) {
        self.intentional_unload.set(true);
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    pub fn mark_completed(&self) {
        self.completed.set(true);
    }

    pub fn is_disarmed(&self) -> bool {
        self.is_completed() || self.is_intentional_unload()
    }

    pub fn last_visibility_change_at(&self) -> Option<Instant> {
        self.last_visibility_change_at.get()
    }

    pub fn record_visibility_change(&self, at: Instant) -> Option<Instant> {
        self.last_visibility_change_at.replace(Some(at))
    }

    pub fn last_heartbeat_at(&self) -> Option<Instant> {
        self.last_heartbeat_at.get()
    }

    pub fn record_heartbeat(&self, at: Instant) -> Option<Instant> {
        self.last_heartbeat_at.replace(Some(at))
    }

    pub fn reset_timing(&self) {
        self.last_visibility_change_at.set(None);
        self.last_heartbeat_at.set(None);
    }
}
