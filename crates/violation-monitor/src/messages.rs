use exam_core::ViolationType;

pub const UNLOAD_PROMPT: &str =
    "Leaving or reloading this page will submit your exam. Are you sure?";

pub fn toast_message(kind: ViolationType) -> &'static str {
    match kind {
        ViolationType::PageRefresh => "Warning: page reload detected. Your exam is being submitted.",
        ViolationType::SuspiciousVisibilityChange => {
            "Warning: suspicious window activity detected. Your exam is being submitted."
        }
        ViolationType::DevToolsOpen => {
            "Warning: developer tools detected. Your exam is being submitted."
        }
        ViolationType::DebugPauseDetected => {
            "Warning: script debugging detected. Your exam is being submitted."
        }
        ViolationType::ContextMenuAttempt => {
            "Warning: right-click is not allowed during the exam. Your exam is being submitted."
        }
    }
}

/// Full-screen overlay text. Plain ASCII so it renders under any locale font.
pub fn overlay_message(kind: ViolationType) -> &'static str {
    match kind {
        ViolationType::PageRefresh => {
            "EXAM VIOLATION: the page was reloaded. Your answers are being submitted automatically."
        }
        ViolationType::SuspiciousVisibilityChange => {
            "EXAM VIOLATION: suspicious window activity. Your answers are being submitted automatically."
        }
        ViolationType::DevToolsOpen => {
            "EXAM VIOLATION: developer tools are open. Your answers are being submitted automatically."
        }
        ViolationType::DebugPauseDetected => {
            "EXAM VIOLATION: script execution was paused. Your answers are being submitted automatically."
        }
        ViolationType::ContextMenuAttempt => {
            "EXAM VIOLATION: context menu use. Your answers are being submitted automatically."
        }
    }
}
