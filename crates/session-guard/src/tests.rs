use crate::{SessionGuard, REFRESH_OVERLAY_MESSAGE};
use exam_core::recording::{Notification, RecordingNavigator, RecordingSink};
use exam_core::{ManualClock, MonitorState, SessionIdentity, SAFE_ROUTE};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::rc::Rc;

struct Fixture {
    state: Rc<MonitorState>,
    clock: Rc<ManualClock>,
    sink: Rc<RecordingSink>,
    navigator: Rc<RecordingNavigator>,
    guard: SessionGuard,
}

fn fixture() -> Fixture {
    let state = Rc::new(MonitorState::new());
    let clock = Rc::new(ManualClock::new());
    let sink = Rc::new(RecordingSink::new());
    let navigator = Rc::new(RecordingNavigator::new());
    let guard = SessionGuard::new(
        state.clone(),
        clock.clone(),
        sink.clone(),
        navigator.clone(),
    );
    Fixture {
        state,
        clock,
        sink,
        navigator,
        guard,
    }
}

fn session(raw: &str) -> SessionIdentity {
    SessionIdentity::parse(raw).expect("valid token")
}

fn random_token(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(4..24);
    rng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

#[test]
fn first_load_never_reports() {
    let mut f = fixture();
    assert!(f.guard.is_first_load());
    assert!(!f.guard.check_refresh(Some("abc123")));
    f.guard.mark_session_active(session("abc123"));
    assert!(!f.guard.check_refresh(Some("other")));
    assert!(f.sink.log().is_empty());
    assert!(!f.state.is_intentional_unload());
}

#[test]
fn matching_session_never_reports() {
    let mut rng = rand::thread_rng();
    for _ in 0..25 {
        let mut f = fixture();
        let token = random_token(&mut rng);
        f.guard.mark_session_active(session(&token));
        f.guard.mount_completed();
        assert!(!f.guard.check_refresh(Some(&token)));
        assert!(!f.guard.check_refresh(Some(&token)));
    }
}

#[test]
fn absent_or_blank_route_session_never_reports() {
    let mut f = fixture();
    f.guard.mount_completed();
    assert!(!f.guard.check_refresh(None));
    assert!(!f.guard.check_refresh(Some("")));
    assert!(!f.guard.check_refresh(Some("  ")));
}

#[test]
fn mismatch_reports_once_and_redirects_after_three_seconds() {
    let mut f = fixture();
    f.guard.mark_session_active(session("abc123"));
    f.guard.mount_completed();

    assert!(f.guard.check_refresh(Some("zzz999")));
    assert!(!f.guard.check_refresh(Some("zzz999")));
    assert!(f.state.is_intentional_unload());
    assert_eq!(
        f.sink.log(),
        vec![Notification::OverlayShown {
            message: REFRESH_OVERLAY_MESSAGE.to_string()
        }]
    );

    f.clock.advance_ms(2999);
    f.guard.run_due_timers();
    assert!(f.navigator.routes().is_empty());

    f.clock.advance_ms(1);
    f.guard.run_due_timers();
    assert_eq!(f.navigator.routes(), vec![SAFE_ROUTE.to_string()]);

    f.clock.advance_ms(10_000);
    f.guard.run_due_timers();
    assert_eq!(f.navigator.routes().len(), 1);
}

#[test]
fn mark_session_active_is_idempotent() {
    let mut f = fixture();
    f.guard.mark_session_active(session("abc123"));
    f.guard.mark_session_active(session("abc123"));
    assert_eq!(f.guard.active_session(), Some(&session("abc123")));

    f.guard.mark_session_active(session("next"));
    f.guard.mount_completed();
    assert!(f.guard.check_refresh(Some("abc123")));
    assert!(!f.guard.check_refresh(Some("next")));
}

#[test]
fn fresh_page_context_reports_reload_of_known_session() {
    {
        let mut first = fixture();
        first.guard.mark_session_active(session("abc123"));
        first.guard.mount_completed();
        assert!(!first.guard.check_refresh(Some("abc123")));
    }

    let mut reloaded = fixture();
    assert!(!reloaded.guard.check_refresh(Some("abc123")));
    reloaded.guard.mount_completed();
    assert!(reloaded.guard.check_refresh(Some("abc123")));

    reloaded.clock.advance_ms(3000);
    reloaded.guard.run_due_timers();
    assert_eq!(reloaded.navigator.routes(), vec![SAFE_ROUTE.to_string()]);
}

#[test]
fn teardown_cancels_pending_redirect() {
    let mut f = fixture();
    f.guard.mount_completed();
    assert!(f.guard.check_refresh(Some("abc123")));
    assert!(f.guard.has_pending_redirect());

    f.guard.teardown();
    f.clock.advance_ms(5000);
    f.guard.run_due_timers();
    assert!(f.navigator.routes().is_empty());
}

#[test]
fn torn_down_guard_ignores_route_checks() {
    let mut f = fixture();
    f.guard.mark_session_active(session("abc123"));
    f.guard.mount_completed();
    f.guard.teardown();

    assert!(f.guard.is_torn_down());
    assert_eq!(f.guard.active_session(), None);
    assert!(!f.guard.check_refresh(Some("other")));
    f.guard.mark_session_active(session("next"));
    assert_eq!(f.guard.active_session(), None);
    assert!(!f.guard.has_pending_redirect());
    assert!(f.sink.log().is_empty());
    assert!(!f.state.is_intentional_unload());

    f.clock.advance_ms(5000);
    f.guard.run_due_timers();
    assert!(f.navigator.routes().is_empty());
}

#[test]
fn completed_exam_is_never_reported_as_reload() {
    let mut f = fixture();
    f.guard.mark_session_active(session("abc123"));
    f.guard.mount_completed();
    f.state.mark_completed();

    assert!(!f.guard.check_refresh(Some("other")));
    assert!(!f.guard.has_pending_redirect());
    assert!(f.sink.log().is_empty());
}
