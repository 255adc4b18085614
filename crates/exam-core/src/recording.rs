//! Collaborators that record every call. Used by scenario replay and by tests.

use crate::error::TransportError;
use crate::ports::{ExamHost, LiveChannel, Navigator, NotificationSink};
use crate::violation::{ViolationDetails, ViolationType};
use serde::Serialize;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Warning { message: String, duration_ms: u64 },
    OverlayShown { message: String },
    OverlayRemoved,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    log: RefCell<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Vec<Notification> {
        self.log.borrow().clone()
    }

    pub fn warnings(&self) -> usize {
        self.count(|n| matches!(n, Notification::Warning { .. }))
    }

    pub fn overlays_shown(&self) -> usize {
        self.count(|n| matches!(n, Notification::OverlayShown { .. }))
    }

    pub fn overlays_removed(&self) -> usize {
        self.count(|n| matches!(n, Notification::OverlayRemoved))
    }

    fn count(&self, pred: impl Fn(&Notification) -> bool) -> usize {
        self.log.borrow().iter().filter(|n| pred(n)).count()
    }
}

impl NotificationSink for RecordingSink {
    fn show_warning(&self, message: &str, duration: Duration) {
        self.log.borrow_mut().push(Notification::Warning {
            message: message.to_string(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        });
    }

    fn show_blocking_overlay(&self, message: &str) {
        self.log.borrow_mut().push(Notification::OverlayShown {
            message: message.to_string(),
        });
    }

    fn remove_overlay(&self) {
        self.log.borrow_mut().push(Notification::OverlayRemoved);
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: &str) {
        self.routes.borrow_mut().push(route.to_string());
    }
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    violations: RefCell<Vec<(ViolationType, ViolationDetails)>>,
    submits: Cell<usize>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn violations(&self) -> Vec<(ViolationType, ViolationDetails)> {
        self.violations.borrow().clone()
    }

    pub fn violation_kinds(&self) -> Vec<ViolationType> {
        self.violations.borrow().iter().map(|(k, _)| *k).collect()
    }

    pub fn submits(&self) -> usize {
        self.submits.get()
    }
}

impl ExamHost for RecordingHost {
    fn on_violation(&self, kind: ViolationType, details: &ViolationDetails) {
        self.violations.borrow_mut().push((kind, details.clone()));
    }

    fn handle_submit(&self) {
        self.submits.set(self.submits.get() + 1);
    }
}

#[derive(Debug, Default)]
pub struct RecordingChannel {
    emitted: RefCell<Vec<(String, Value)>>,
    failing: Cell<bool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.emitted.borrow().clone()
    }
}

impl LiveChannel for RecordingChannel {
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError> {
        if self.failing.get() {
            return Err(TransportError::Disconnected);
        }
        self.emitted
            .borrow_mut()
            .push((event.to_string(), payload.clone()));
        Ok(())
    }
}
