use crate::messages::{overlay_message, toast_message, UNLOAD_PROMPT};
use crate::probe::{BrowserEnvironment, DevtoolsBattery};
use exam_core::{
    Clock, ConfigError, DetectionExtras, ExamHost, LiveChannel, MonitorConfig, MonitorObserver, MonitorState,
    NoopObserver, NotificationSink, SessionIdentity, TimerId, TimerQueue, TransportError,
    ViolationDetails, ViolationEvent, ViolationType, AUTO_SUBMIT_DELAY, EXAM_VIOLATION_EVENT,
    OVERLAY_LINGER,
};
use serde_json::json;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const LISTENERS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArmError {
    #[error("no exam session is bound to the monitor")]
    NoSession,
    #[error("no live channel is bound to the monitor")]
    NoChannel,
    #[error("exam is already completed")]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadDecision {
    Proceed,
    /// Cancel the navigation and show `prompt`.
    Block { prompt: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenuDecision {
    ShowDefault,
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorTimer {
    DevtoolsProbe,
    DebuggerTick,
    AutoSubmit,
    RemoveOverlay,
}

/// Watches the exam page for integrity violations and forces submission when
/// one fires.
///
/// The host feeds browser events in and calls [`ViolationMonitor::run_due_timers`]
/// from its event loop. Every entry point re-checks the shared flags, and the
/// monitor tears itself down as soon as it sees the exam completed.
pub struct ViolationMonitor {
    config: MonitorConfig,
    state: Rc<MonitorState>,
    clock: Rc<dyn Clock>,
    environment: Rc<dyn BrowserEnvironment>,
    sink: Rc<dyn NotificationSink>,
    host: Rc<dyn ExamHost>,
    channel: Option<Rc<dyn LiveChannel>>,
    observer: Rc<dyn MonitorObserver>,
    session: Option<SessionIdentity>,
    battery: DevtoolsBattery,
    armed: bool,
    overlay_shown: bool,
    devtools_interval: Option<TimerId>,
    debugger_interval: Option<TimerId>,
    timers: TimerQueue<MonitorTimer>,
}

impl ViolationMonitor {
    pub fn new(
        config: MonitorConfig,
        state: Rc<MonitorState>,
        clock: Rc<dyn Clock>,
        environment: Rc<dyn BrowserEnvironment>,
        sink: Rc<dyn NotificationSink>,
        host: Rc<dyn ExamHost>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let battery = DevtoolsBattery::from_config(&config);
        Ok(Self {
            config,
            state,
            clock,
            environment,
            sink,
            host,
            channel: None,
            observer: Rc::new(NoopObserver),
            session: None,
            battery,
            armed: false,
            overlay_shown: false,
            devtools_interval: None,
            debugger_interval: None,
            timers: TimerQueue::new(),
        })
    }

    pub fn with_observer(mut self, observer: Rc<dyn MonitorObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_battery(mut self, battery: DevtoolsBattery) -> Self {
        self.battery = battery;
        self
    }

    pub fn bind_channel(&mut self, channel: Rc<dyn LiveChannel>) {
        self.channel = Some(channel);
    }

    pub fn bind_session(&mut self, session: SessionIdentity) {
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&SessionIdentity> {
        self.session.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn installed_listeners(&self) -> usize {
        if self.armed {
            LISTENERS
        } else {
            0
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Idempotent while armed.
    pub fn arm(&mut self) -> Result<(), ArmError> {
        if self.armed {
            return Ok(());
        }
        if self.state.is_completed() {
            return Err(ArmError::Completed);
        }
        let Some(session) = self.session.as_ref() else {
            return Err(ArmError::NoSession);
        };
        if self.channel.is_none() {
            return Err(ArmError::NoChannel);
        }

        let now = self.clock.now();
        self.state.reset_timing();
        self.state.record_heartbeat(now);
        if !self.battery.is_empty() {
            self.devtools_interval = Some(self.timers.schedule_interval(
                now,
                self.config.devtools_probe_interval(),
                MonitorTimer::DevtoolsProbe,
            ));
        }
        if self.config.probes.debugger_pause {
            self.debugger_interval = Some(self.timers.schedule_interval(
                now,
                self.config.debugger_tick_interval(),
                MonitorTimer::DebuggerTick,
            ));
        }
        self.armed = true;
        debug!(
            session_id = %session,
            probes = ?self.battery.probe_names(),
            "violation monitor armed"
        );
        Ok(())
    }

    pub fn teardown(&mut self) {
        if !self.armed && self.timers.is_empty() && !self.overlay_shown {
            return;
        }
        debug!(pending = self.timers.len(), "violation monitor torn down");
        self.timers.clear();
        self.devtools_interval = None;
        self.debugger_interval = None;
        self.armed = false;
        if self.overlay_shown {
            self.overlay_shown = false;
            self.sink.remove_overlay();
        }
    }

    /// Tears down if the exam completed since the last call. Returns whether
    /// the monitor is still armed.
    fn sync_completion(&mut self) -> bool {
        if self.state.is_completed() {
            self.teardown();
        }
        self.armed
    }

    pub fn before_unload(&mut self) -> UnloadDecision {
        if !self.sync_completion() || self.state.is_disarmed() {
            return UnloadDecision::Proceed;
        }
        self.handle_violation(ViolationType::PageRefresh, DetectionExtras::new());
        UnloadDecision::Block {
            prompt: UNLOAD_PROMPT,
        }
    }

    pub fn visibility_changed(&mut self) {
        if !self.sync_completion() || self.state.is_disarmed() {
            return;
        }
        let now = self.clock.now();
        let Some(previous) = self.state.record_visibility_change(now) else {
            return;
        };
        let gap = now.saturating_duration_since(previous);
        if gap < self.config.visibility_flap_window() {
            let mut extras = DetectionExtras::new();
            extras.insert("interval_ms".into(), json!(millis(gap)));
            self.handle_violation(ViolationType::SuspiciousVisibilityChange, extras);
        }
    }

    pub fn context_menu(&mut self) -> ContextMenuDecision {
        if !self.sync_completion() {
            return ContextMenuDecision::ShowDefault;
        }
        if !self.state.is_disarmed() {
            self.handle_violation(ViolationType::ContextMenuAttempt, DetectionExtras::new());
        }
        ContextMenuDecision::Suppress
    }

    pub fn run_due_timers(&mut self) {
        if !self.sync_completion() && self.timers.is_empty() {
            return;
        }
        let now = self.clock.now();
        while let Some(fired) = self.timers.pop_due(now) {
            match fired.kind {
                MonitorTimer::DevtoolsProbe => self.devtools_tick(),
                MonitorTimer::DebuggerTick => self.debugger_tick(now),
                MonitorTimer::AutoSubmit => {
                    debug!("auto-submitting exam after violation");
                    self.host.handle_submit();
                    self.timers
                        .schedule_once(self.clock.now(), OVERLAY_LINGER, MonitorTimer::RemoveOverlay);
                }
                MonitorTimer::RemoveOverlay => {
                    if self.overlay_shown {
                        self.overlay_shown = false;
                        self.sink.remove_overlay();
                    }
                }
            }
            if !self.sync_completion() {
                break;
            }
        }
    }

    fn devtools_tick(&mut self) {
        if self.state.is_disarmed() {
            return;
        }
        let Some(evidence) = self.battery.run(self.environment.as_ref(), self.observer.as_ref())
        else {
            return;
        };
        if let Some(id) = self.devtools_interval.take() {
            self.timers.cancel(id);
        }
        self.handle_violation(ViolationType::DevToolsOpen, evidence);
    }

    fn debugger_tick(&mut self, now: std::time::Instant) {
        let previous = self.state.record_heartbeat(now);
        if self.state.is_disarmed() {
            return;
        }
        let Some(previous) = previous else {
            return;
        };
        let expected = self.config.debugger_tick_interval();
        let actual = now.saturating_duration_since(previous);
        let delay = actual.saturating_sub(expected);
        if delay > self.config.debugger_tolerance() {
            if let Some(id) = self.debugger_interval.take() {
                self.timers.cancel(id);
            }
            let mut extras = DetectionExtras::new();
            extras.insert("delay".into(), json!(millis(delay)));
            extras.insert("expected_ms".into(), json!(millis(expected)));
            self.handle_violation(ViolationType::DebugPauseDetected, extras);
        }
    }

    fn handle_violation(&mut self, kind: ViolationType, extras: DetectionExtras) {
        if self.state.is_disarmed() {
            debug!(violation = %kind, "violation ignored; monitor disarmed");
            return;
        }
        let (Some(session), Some(channel)) = (self.session.clone(), self.channel.clone()) else {
            debug!(violation = %kind, "violation ignored; no session or channel bound");
            return;
        };

        self.state.mark_intentional_unload();
        self.sink
            .show_warning(toast_message(kind), self.config.warning_toast());

        let details =
            ViolationDetails::enrich(extras, self.clock.utc_now(), self.environment.device_info());
        info!(session_id = %session, violation = %kind, "exam integrity violation");
        self.observer.violation_reported(kind);

        let event = ViolationEvent::new(session, kind, details.clone());
        if let Err(err) = emit(channel.as_ref(), &event) {
            warn!(violation = %kind, error = %err, "violation report not delivered");
            self.observer.transport_failed();
        }

        self.sink.show_blocking_overlay(overlay_message(kind));
        self.overlay_shown = true;
        self.host.on_violation(kind, &details);
        self.timers
            .schedule_once(self.clock.now(), AUTO_SUBMIT_DELAY, MonitorTimer::AutoSubmit);
    }
}

impl Drop for ViolationMonitor {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn emit(channel: &dyn LiveChannel, event: &ViolationEvent) -> Result<(), TransportError> {
    let payload = event
        .to_payload()
        .map_err(|e| TransportError::Encode(e.to_string()))?;
    channel.emit(EXAM_VIOLATION_EVENT, &payload)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
