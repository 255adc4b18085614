use exam_core::{ExamHost, ViolationDetails, ViolationType};
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

/// Lets the host's submit through at most once per attempt, however many
/// detection channels or safe-submit calls ask for it.
pub struct SubmitGate {
    host: Rc<dyn ExamHost>,
    submitted: Cell<bool>,
}

impl SubmitGate {
    pub fn new(host: Rc<dyn ExamHost>) -> Self {
        Self {
            host,
            submitted: Cell::new(false),
        }
    }

    pub fn has_submitted(&self) -> bool {
        self.submitted.get()
    }
}

impl ExamHost for SubmitGate {
    fn on_violation(&self, kind: ViolationType, details: &ViolationDetails) {
        self.host.on_violation(kind, details);
    }

    fn handle_submit(&self) {
        if self.submitted.replace(true) {
            debug!("duplicate submit request dropped");
            return;
        }
        self.host.handle_submit();
    }
}
