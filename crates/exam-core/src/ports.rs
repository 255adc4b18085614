//! Collaborators the monitor talks to. The exam page supplies real
//! implementations; tests and scenario replay supply recording ones.

use crate::error::TransportError;
use crate::violation::{ViolationDetails, ViolationType};
use serde_json::Value;
use std::time::Duration;

pub const SAFE_ROUTE: &str = "/student";

pub trait LiveChannel {
    /// Fire-and-forget emit; no acknowledgement is awaited.
    fn emit(&self, event: &str, payload: &Value) -> Result<(), TransportError>;
}

pub trait ExamHost {
    fn on_violation(&self, kind: ViolationType, details: &ViolationDetails);
    /// Forces exam submission. Must tolerate repeated calls.
    fn handle_submit(&self);
}

pub trait Navigator {
    fn replace(&self, route: &str);
}

pub trait NotificationSink {
    fn show_warning(&self, message: &str, duration: Duration);
    fn show_blocking_overlay(&self, message: &str);
    fn remove_overlay(&self);
}

pub trait MonitorObserver {
    fn violation_reported(&self, _kind: ViolationType) {}
    fn probe_failed(&self, _probe: &str) {}
    fn transport_failed(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MonitorObserver for NoopObserver {}
