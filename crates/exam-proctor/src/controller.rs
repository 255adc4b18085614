use crate::submit_gate::SubmitGate;
use exam_core::{
    Clock, ConfigError, ExamHost, LiveChannel, MonitorConfig, MonitorObserver, MonitorState,
    Navigator, NotificationSink, SessionIdError, SessionIdentity,
};
use session_guard::SessionGuard;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, info};
use violation_monitor::{
    ArmError, BrowserEnvironment, ContextMenuDecision, UnloadDecision, ViolationMonitor,
};

#[derive(Debug, Error)]
pub enum ProctorError {
    #[error(transparent)]
    InvalidSession(#[from] SessionIdError),
    #[error("violation monitor could not arm: {0}")]
    Arm(#[from] ArmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone)]
pub struct Collaborators {
    pub clock: Rc<dyn Clock>,
    pub environment: Rc<dyn BrowserEnvironment>,
    pub sink: Rc<dyn NotificationSink>,
    pub navigator: Rc<dyn Navigator>,
    pub host: Rc<dyn ExamHost>,
    pub channel: Rc<dyn LiveChannel>,
    pub observer: Option<Rc<dyn MonitorObserver>>,
}

/// Exam-page controller. Owns the shared [`MonitorState`] and wires the
/// session guard and the violation monitor to the page's collaborators.
///
/// One `ExamSession` corresponds to one page context: mount a new one on a
/// real page load, keep the existing one across component re-renders.
///
/// Host callbacks must not call back into the `ExamSession`. A host that
/// finishes the exam from inside `handle_submit` marks
/// [`ExamSession::state`] completed instead; both units notice on their next
/// entry point.
pub struct ExamSession {
    state: Rc<MonitorState>,
    gate: Rc<SubmitGate>,
    guard: SessionGuard,
    monitor: ViolationMonitor,
}

impl ExamSession {
    pub fn mount(config: MonitorConfig, parts: Collaborators) -> Result<Self, ProctorError> {
        let state = Rc::new(MonitorState::new());
        let gate = Rc::new(SubmitGate::new(parts.host));
        let guard = SessionGuard::new(
            state.clone(),
            parts.clock.clone(),
            parts.sink.clone(),
            parts.navigator,
        );
        let mut monitor = ViolationMonitor::new(
            config,
            state.clone(),
            parts.clock,
            parts.environment,
            parts.sink,
            gate.clone(),
        )?;
        if let Some(observer) = parts.observer {
            monitor = monitor.with_observer(observer);
        }
        monitor.bind_channel(parts.channel);
        debug!("exam session mounted");
        Ok(Self {
            state,
            gate,
            guard,
            monitor,
        })
    }

    pub fn state(&self) -> Rc<MonitorState> {
        self.state.clone()
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn monitor(&self) -> &ViolationMonitor {
        &self.monitor
    }

    pub fn has_submitted(&self) -> bool {
        self.gate.has_submitted()
    }

    pub fn finish_mount(&mut self) {
        self.guard.mount_completed();
    }

    pub fn start(&mut self, session_id: &str) -> Result<(), ProctorError> {
        let session = SessionIdentity::parse(session_id)?;
        self.guard.mark_session_active(session.clone());
        self.monitor.bind_session(session.clone());
        self.monitor.arm()?;
        info!(session_id = %session, "exam session started");
        Ok(())
    }

    pub fn enter_route(&mut self, route_session_id: Option<&str>) -> bool {
        self.guard.check_refresh(route_session_id)
    }

    pub fn before_unload(&mut self) -> UnloadDecision {
        self.monitor.before_unload()
    }

    pub fn visibility_changed(&mut self) {
        self.monitor.visibility_changed();
    }

    pub fn context_menu(&mut self) -> ContextMenuDecision {
        self.monitor.context_menu()
    }

    /// The designated safe-submit path. Marks the coming unload intentional so
    /// the post-submit redirect is not taken for a refresh.
    pub fn safe_submit(&mut self) {
        self.state.mark_intentional_unload();
        self.gate.handle_submit();
    }

    pub fn complete(&mut self) {
        if self.state.is_completed() {
            return;
        }
        self.state.mark_completed();
        self.unmount();
        info!("exam session completed");
    }

    pub fn run_due_timers(&mut self) {
        self.guard.run_due_timers();
        self.monitor.run_due_timers();
    }

    pub fn unmount(&mut self) {
        self.monitor.teardown();
        self.guard.teardown();
    }
}
