use crate::device::DeviceInfo;
use crate::session::SessionIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub const EXAM_VIOLATION_EVENT: &str = "exam_violation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    PageRefresh,
    SuspiciousVisibilityChange,
    DevToolsOpen,
    DebugPauseDetected,
    ContextMenuAttempt,
}

impl ViolationType {
    pub const ALL: [ViolationType; 5] = [
        ViolationType::PageRefresh,
        ViolationType::SuspiciousVisibilityChange,
        ViolationType::DevToolsOpen,
        ViolationType::DebugPauseDetected,
        ViolationType::ContextMenuAttempt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViolationType::PageRefresh => "page_refresh",
            ViolationType::SuspiciousVisibilityChange => "suspicious_visibility_change",
            ViolationType::DevToolsOpen => "dev_tools_open",
            ViolationType::DebugPauseDetected => "debug_pause_detected",
            ViolationType::ContextMenuAttempt => "context_menu_attempt",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type DetectionExtras = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationDetails {
    pub timestamp: DateTime<Utc>,
    pub device_info: DeviceInfo,
    #[serde(flatten)]
    pub extra: DetectionExtras,
}

impl ViolationDetails {
    pub fn enrich(extra: DetectionExtras, timestamp: DateTime<Utc>, device_info: DeviceInfo) -> Self {
        Self {
            timestamp,
            device_info,
            extra,
        }
    }

    /// Measured debugger-pause lateness in milliseconds, when present.
    pub fn delay_ms(&self) -> Option<u64> {
        self.extra.get("delay").and_then(Value::as_u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub event_id: Uuid,
    pub session_id: SessionIdentity,
    #[serde(rename = "type")]
    pub kind: ViolationType,
    pub details: ViolationDetails,
}

impl ViolationEvent {
    pub fn new(session_id: SessionIdentity, kind: ViolationType, details: ViolationDetails) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_id,
            kind,
            details,
        }
    }

    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
