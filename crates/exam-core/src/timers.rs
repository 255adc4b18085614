use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Shortest interval period. Browsers clamp `setInterval(f, 0)` the same way.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<K> {
    kind: K,
    due: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    pub id: TimerId,
    pub kind: K,
    pub scheduled_for: Instant,
}

/// Single-threaded timer queue modelled on browser `setTimeout`/`setInterval`.
///
/// An overdue interval fires once when it is observed and is rescheduled one
/// period after the observation, so a stalled loop shows up as lateness on the
/// next firing instead of as a burst of catch-up callbacks.
#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    next_id: u64,
    timers: BTreeMap<TimerId, Timer<K>>,
}

impl<K: Clone> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            timers: BTreeMap::new(),
        }
    }

    pub fn schedule_once(&mut self, now: Instant, delay: Duration, kind: K) -> TimerId {
        self.insert(Timer {
            kind,
            due: now + delay,
            period: None,
        })
    }

    pub fn schedule_interval(&mut self, now: Instant, period: Duration, kind: K) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.insert(Timer {
            kind,
            due: now + period,
            period: Some(period),
        })
    }

    fn insert(&mut self, timer: Timer<K>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, timer);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.due).min()
    }

    /// Removes (or reschedules, for intervals) the earliest timer due at `now`.
    /// Ties go to the timer scheduled first.
    pub fn pop_due(&mut self, now: Instant) -> Option<Fired<K>> {
        let (&id, _) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(id, t)| (t.due, **id))?;

        let timer = self.timers.get_mut(&id)?;
        let fired = Fired {
            id,
            kind: timer.kind.clone(),
            scheduled_for: timer.due,
        };
        match timer.period {
            Some(period) => timer.due = now + period,
            None => {
                self.timers.remove(&id);
            }
        }
        Some(fired)
    }
}

impl<K: Clone> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
