use exam_core::{
    Clock, MonitorState, Navigator, NotificationSink, SessionIdentity, TimerId, TimerQueue,
    REFRESH_REDIRECT_DELAY, SAFE_ROUTE,
};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{debug, info};

pub const REFRESH_OVERLAY_MESSAGE: &str =
    "This exam page was reloaded during an active session. Refreshing is not allowed; \
     you will be returned to your dashboard.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardTimer {
    RedirectToSafeRoute,
}

/// Detects a fresh page context for a session that was already recorded
/// active. A guard instance lives exactly as long as one page context: the
/// host creates a new one only on a real page load.
pub struct SessionGuard {
    state: Rc<MonitorState>,
    clock: Rc<dyn Clock>,
    sink: Rc<dyn NotificationSink>,
    navigator: Rc<dyn Navigator>,
    is_first_load: bool,
    active_session: Option<SessionIdentity>,
    reported: BTreeSet<SessionIdentity>,
    redirect: Option<TimerId>,
    timers: TimerQueue<GuardTimer>,
    torn_down: bool,
}

impl SessionGuard {
    pub fn new(
        state: Rc<MonitorState>,
        clock: Rc<dyn Clock>,
        sink: Rc<dyn NotificationSink>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self {
            state,
            clock,
            sink,
            navigator,
            is_first_load: true,
            active_session: None,
            reported: BTreeSet::new(),
            redirect: None,
            timers: TimerQueue::new(),
            torn_down: false,
        }
    }

    pub fn mount_completed(&mut self) {
        if self.is_first_load {
            debug!("session guard mounted; first-load grace cleared");
            self.is_first_load = false;
        }
    }

    pub fn is_first_load(&self) -> bool {
        self.is_first_load
    }

    pub fn mark_session_active(&mut self, session_id: SessionIdentity) {
        if self.torn_down || self.active_session.as_ref() == Some(&session_id) {
            return;
        }
        debug!(session_id = %session_id, "session marked active");
        self.active_session = Some(session_id);
    }

    pub fn active_session(&self) -> Option<&SessionIdentity> {
        self.active_session.as_ref()
    }

    /// `true` means the page was reloaded mid-exam. Each distinct mismatching
    /// token is reported once.
    pub fn check_refresh(&mut self, route_session_id: Option<&str>) -> bool {
        if self.torn_down || self.state.is_completed() {
            return false;
        }
        if self.is_first_load {
            return false;
        }
        let Some(route_session) = SessionIdentity::from_route(route_session_id) else {
            return false;
        };
        if self.active_session.as_ref() == Some(&route_session) {
            return false;
        }
        if !self.reported.insert(route_session.clone()) {
            return false;
        }

        info!(
            session_id = %route_session,
            active = ?self.active_session.as_ref().map(SessionIdentity::as_str),
            "page refresh detected for exam session"
        );
        self.state.mark_intentional_unload();
        self.sink.show_blocking_overlay(REFRESH_OVERLAY_MESSAGE);
        if self.redirect.is_none() {
            let id = self.timers.schedule_once(
                self.clock.now(),
                REFRESH_REDIRECT_DELAY,
                GuardTimer::RedirectToSafeRoute,
            );
            self.redirect = Some(id);
        }
        true
    }

    pub fn has_pending_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    pub fn run_due_timers(&mut self) {
        let now = self.clock.now();
        while let Some(fired) = self.timers.pop_due(now) {
            match fired.kind {
                GuardTimer::RedirectToSafeRoute => {
                    self.redirect = None;
                    debug!(route = SAFE_ROUTE, "redirecting after refresh violation");
                    self.navigator.replace(SAFE_ROUTE);
                }
            }
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Ends the attempt for this page context. Later route checks are inert.
    pub fn teardown(&mut self) {
        if !self.timers.is_empty() {
            debug!(pending = self.timers.len(), "session guard torn down");
        }
        self.timers.clear();
        self.redirect = None;
        self.active_session = None;
        self.torn_down = true;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.teardown();
    }
}
