use crate::messages::{overlay_message, UNLOAD_PROMPT};
use crate::{
    ArmError, ContextMenuDecision, DevtoolsBattery, ScriptedEnvironment, UnloadDecision,
    ViolationMonitor, WindowMetrics, WindowSizeProbe,
};
use exam_core::recording::{Notification, RecordingChannel, RecordingHost, RecordingSink};
use exam_core::{
    ConfigError, ManualClock, MonitorConfig, MonitorObserver, MonitorState, SessionIdentity, ViolationType,
    EXAM_VIOLATION_EVENT,
};
use rand::Rng;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct CountingObserver {
    reported: RefCell<Vec<ViolationType>>,
    probe_failures: RefCell<Vec<String>>,
    transport_failures: Cell<usize>,
}

impl MonitorObserver for CountingObserver {
    fn violation_reported(&self, kind: ViolationType) {
        self.reported.borrow_mut().push(kind);
    }

    fn probe_failed(&self, probe: &str) {
        self.probe_failures.borrow_mut().push(probe.to_string());
    }

    fn transport_failed(&self) {
        self.transport_failures.set(self.transport_failures.get() + 1);
    }
}

struct Fixture {
    state: Rc<MonitorState>,
    clock: Rc<ManualClock>,
    env: Rc<ScriptedEnvironment>,
    sink: Rc<RecordingSink>,
    host: Rc<RecordingHost>,
    channel: Rc<RecordingChannel>,
    observer: Rc<CountingObserver>,
    monitor: ViolationMonitor,
}

impl Fixture {
    /// Advances time in small steps, running timers like a live event loop.
    fn step(&mut self, total_ms: u64) {
        let mut left = total_ms;
        while left > 0 {
            let slice = left.min(50);
            self.clock.advance_ms(slice);
            self.monitor.run_due_timers();
            left -= slice;
        }
    }

    /// Advances time without running timers, as if the page's thread stalled.
    fn stall(&mut self, ms: u64) {
        self.clock.advance_ms(ms);
        self.monitor.run_due_timers();
    }
}

fn unarmed() -> Fixture {
    let state = Rc::new(MonitorState::new());
    let clock = Rc::new(ManualClock::new());
    let env = Rc::new(ScriptedEnvironment::desktop());
    let sink = Rc::new(RecordingSink::new());
    let host = Rc::new(RecordingHost::new());
    let channel = Rc::new(RecordingChannel::new());
    let observer = Rc::new(CountingObserver::default());
    let monitor = ViolationMonitor::new(
        MonitorConfig::default(),
        state.clone(),
        clock.clone(),
        env.clone(),
        sink.clone(),
        host.clone(),
    )
    .expect("valid config")
    .with_observer(observer.clone());
    Fixture {
        state,
        clock,
        env,
        sink,
        host,
        channel,
        observer,
        monitor,
    }
}

fn armed() -> Fixture {
    let mut f = unarmed();
    f.monitor.bind_channel(f.channel.clone());
    f.monitor
        .bind_session(SessionIdentity::parse("abc123").expect("token"));
    f.monitor.arm().expect("arm");
    f
}

#[test]
fn arming_requires_session_channel_and_open_exam() {
    let mut f = unarmed();
    assert_eq!(f.monitor.arm(), Err(ArmError::NoSession));
    f.monitor
        .bind_session(SessionIdentity::parse("abc123").expect("token"));
    assert_eq!(f.monitor.arm(), Err(ArmError::NoChannel));
    f.monitor.bind_channel(f.channel.clone());
    f.state.mark_completed();
    assert_eq!(f.monitor.arm(), Err(ArmError::Completed));
    assert_eq!(f.monitor.installed_listeners(), 0);
    assert_eq!(f.monitor.pending_timers(), 0);
}

#[test]
fn arming_twice_installs_once() {
    let mut f = armed();
    assert_eq!(f.monitor.installed_listeners(), 3);
    assert_eq!(f.monitor.pending_timers(), 2);
    f.monitor.arm().expect("re-arm");
    assert_eq!(f.monitor.pending_timers(), 2);
}

#[test]
fn context_menu_runs_full_violation_sequence() {
    let mut f = armed();
    assert_eq!(f.monitor.context_menu(), ContextMenuDecision::Suppress);

    assert!(f.state.is_intentional_unload());
    assert_eq!(f.host.violation_kinds(), vec![ViolationType::ContextMenuAttempt]);
    assert_eq!(f.sink.warnings(), 1);
    assert_eq!(f.sink.overlays_shown(), 1);
    match &f.sink.log()[0] {
        Notification::Warning { duration_ms, .. } => assert_eq!(*duration_ms, 7000),
        other => panic!("expected toast first, got {other:?}"),
    }
    assert_eq!(
        f.sink.log()[1],
        Notification::OverlayShown {
            message: overlay_message(ViolationType::ContextMenuAttempt).to_string()
        }
    );

    let emitted = f.channel.emitted();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, EXAM_VIOLATION_EVENT);
    assert_eq!(emitted[0].1["type"], json!("context_menu_attempt"));
    assert_eq!(emitted[0].1["session_id"], json!("abc123"));
    assert_eq!(
        emitted[0].1["details"]["device_info"]["platform"],
        json!("Linux x86_64")
    );

    f.step(1950);
    assert_eq!(f.host.submits(), 0);
    f.step(50);
    assert_eq!(f.host.submits(), 1);
    assert_eq!(f.sink.overlays_removed(), 0);

    f.step(3000);
    assert_eq!(f.sink.overlays_removed(), 1);
    f.step(10_000);
    assert_eq!(f.host.submits(), 1);
    assert_eq!(f.observer.reported.borrow().len(), 1);
}

#[test]
fn unload_blocks_and_reports_page_refresh() {
    let mut f = armed();
    assert_eq!(
        f.monitor.before_unload(),
        UnloadDecision::Block {
            prompt: UNLOAD_PROMPT
        }
    );
    assert_eq!(f.host.violation_kinds(), vec![ViolationType::PageRefresh]);
}

#[test]
fn intentional_unload_suppresses_page_refresh() {
    let mut f = armed();
    f.state.mark_intentional_unload();
    assert_eq!(f.monitor.before_unload(), UnloadDecision::Proceed);
    assert!(f.host.violations().is_empty());
    assert!(f.channel.emitted().is_empty());
}

#[test]
fn visibility_flapping_within_window_is_flagged() {
    let mut f = armed();
    f.monitor.visibility_changed();
    f.clock.advance_ms(50);
    f.monitor.visibility_changed();
    assert_eq!(
        f.host.violation_kinds(),
        vec![ViolationType::SuspiciousVisibilityChange]
    );
    assert_eq!(f.host.violations()[0].1.extra["interval_ms"], json!(50));
}

#[test]
fn slow_visibility_changes_are_ignored() {
    let mut f = armed();
    f.monitor.visibility_changed();
    f.step(500);
    f.monitor.visibility_changed();
    f.step(500);
    f.monitor.visibility_changed();
    assert!(f.host.violations().is_empty());
}

#[test]
fn debugger_pause_beyond_tolerance_is_flagged() {
    let mut f = armed();
    f.stall(500);
    assert!(f.host.violations().is_empty());
    f.stall(750);
    let violations = f.host.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].0, ViolationType::DebugPauseDetected);
    assert_eq!(violations[0].1.delay_ms(), Some(250));
}

#[test]
fn debugger_jitter_within_tolerance_is_ignored() {
    let mut f = armed();
    f.stall(500);
    f.stall(550);
    f.stall(500);
    assert!(f.host.violations().is_empty());
}

#[test]
fn jittered_event_loop_never_trips_probes() {
    let mut rng = rand::thread_rng();
    let mut f = armed();
    let mut elapsed = 0;
    while elapsed < 15_000 {
        let slice = rng.gen_range(1..=200);
        f.stall(slice);
        elapsed += slice;
    }
    assert!(f.host.violations().is_empty());
    assert_eq!(f.monitor.pending_timers(), 2);
}

#[test]
fn docked_devtools_fire_once_on_probe_tick() {
    let mut f = armed();
    f.env.set_window(Some(WindowMetrics {
        outer_width: 1920,
        outer_height: 1080,
        inner_width: 1700,
        inner_height: 980,
    }));
    f.step(2950);
    assert!(f.host.violations().is_empty());
    f.step(50);

    let violations = f.host.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].0, ViolationType::DevToolsOpen);
    assert_eq!(violations[0].1.extra["probe"], json!("window_size"));
    assert_eq!(violations[0].1.extra["width_delta"], json!(220));

    f.step(9000);
    assert_eq!(f.host.violations().len(), 1);
    assert_eq!(f.host.submits(), 1);
}

#[test]
fn failing_probes_do_not_stop_the_battery() {
    let mut f = armed();
    f.env.set_style_probe_fails(true);
    f.env.set_window(None);
    f.env.set_console_time(Some(Duration::from_millis(180)));
    f.step(3000);

    assert_eq!(
        *f.observer.probe_failures.borrow(),
        vec!["style_mutation".to_string(), "window_size".to_string()]
    );
    let violations = f.host.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].1.extra["probe"], json!("console_timing"));
}

#[test]
fn custom_battery_replaces_config_probes() {
    let mut f = unarmed();
    f.monitor = ViolationMonitor::new(
        MonitorConfig::default(),
        f.state.clone(),
        f.clock.clone(),
        f.env.clone(),
        f.sink.clone(),
        f.host.clone(),
    )
    .expect("valid config")
    .with_battery(DevtoolsBattery::empty().with_probe(WindowSizeProbe { threshold_px: 50 }));
    f.monitor.bind_channel(f.channel.clone());
    f.monitor
        .bind_session(SessionIdentity::parse("abc123").expect("token"));
    f.monitor.arm().expect("arm");

    f.step(3000);
    assert_eq!(f.host.violation_kinds(), vec![ViolationType::DevToolsOpen]);
}

#[test]
fn transport_failure_still_enforces() {
    let mut f = armed();
    f.channel.set_failing(true);
    f.monitor.context_menu();

    assert_eq!(f.observer.transport_failures.get(), 1);
    assert_eq!(f.sink.overlays_shown(), 1);
    assert_eq!(f.host.violations().len(), 1);
    f.step(2000);
    assert_eq!(f.host.submits(), 1);
}

#[test]
fn near_simultaneous_channels_submit_once() {
    let mut f = armed();
    f.monitor.context_menu();
    assert_eq!(f.monitor.before_unload(), UnloadDecision::Proceed);
    f.monitor.visibility_changed();
    f.monitor.visibility_changed();
    f.stall(1500);

    assert_eq!(f.host.violations().len(), 1);
    assert_eq!(f.channel.emitted().len(), 1);
    f.step(5000);
    assert_eq!(f.host.submits(), 1);
}

#[test]
fn completed_exam_produces_no_callbacks() {
    let mut f = armed();
    f.state.mark_completed();
    f.env.set_style_mutated(true);

    assert_eq!(f.monitor.before_unload(), UnloadDecision::Proceed);
    assert_eq!(f.monitor.context_menu(), ContextMenuDecision::ShowDefault);
    f.monitor.visibility_changed();
    f.clock.advance_ms(10);
    f.monitor.visibility_changed();
    f.stall(4000);

    assert!(f.host.violations().is_empty());
    assert_eq!(f.host.submits(), 0);
    assert!(f.channel.emitted().is_empty());
    assert_eq!(f.monitor.installed_listeners(), 0);
    assert_eq!(f.monitor.pending_timers(), 0);
}

#[test]
fn completion_before_auto_submit_cancels_it() {
    let mut f = armed();
    f.monitor.context_menu();
    f.step(1000);
    f.state.mark_completed();
    f.step(5000);

    assert_eq!(f.host.submits(), 0);
    assert_eq!(f.monitor.pending_timers(), 0);
    assert_eq!(f.sink.overlays_removed(), 1);
}

#[test]
fn teardown_leaves_nothing_running() {
    let mut f = armed();
    f.monitor.context_menu();
    f.monitor.teardown();
    assert_eq!(f.monitor.pending_timers(), 0);
    assert_eq!(f.monitor.installed_listeners(), 0);

    f.env.set_style_mutated(true);
    f.step(10_000);
    assert_eq!(f.monitor.context_menu(), ContextMenuDecision::ShowDefault);
    assert_eq!(f.host.violations().len(), 1);
    assert_eq!(f.host.submits(), 0);
    assert_eq!(f.sink.overlays_removed(), 1);
}

#[test]
fn zero_debugger_interval_is_rejected() {
    let config = MonitorConfig {
        debugger_tick_interval_ms: 0,
        ..MonitorConfig::default()
    };
    let result = ViolationMonitor::new(
        config,
        Rc::new(MonitorState::new()),
        Rc::new(ManualClock::new()),
        Rc::new(ScriptedEnvironment::desktop()),
        Rc::new(RecordingSink::new()),
        Rc::new(RecordingHost::new()),
    );
    assert!(matches!(
        result,
        Err(ConfigError::OutOfRange {
            field: "debugger_tick_interval_ms",
            value: 0,
            ..
        })
    ));
}
