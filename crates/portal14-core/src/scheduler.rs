//! Cooperative single-threaded timer scheduler.
//!
//! Like the rest of the core it owns no thread and never sleeps. The caller
//! passes the current instant to [`Scheduler::pop_due`] and fires whatever
//! comes back, one timer at a time, so a firing timer may cancel or schedule
//! others before the next one is considered.
//!
//! Every timer carries a [`Scope`]. Cancelling a scope releases all of its
//! timers at once, which is how phase exits and panel closes make sure no
//! stale callback outlives its owner.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Owner tag for a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "phase", rename_all = "snake_case")]
pub enum Scope {
    /// Lives exactly as long as the given phase.
    Phase(Phase),
    /// Lives while the letter panel is open.
    Letter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(u64);

/// A timer that came due.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<A> {
    pub id: TimerId,
    pub scope: Scope,
    /// Instant the timer was due, not the instant it was polled.
    pub due: DateTime<Utc>,
    pub action: A,
}

#[derive(Debug, Clone)]
struct Timer<A> {
    id: TimerId,
    scope: Scope,
    due: DateTime<Utc>,
    period: Option<Duration>,
    action: A,
}

#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    next_id: u64,
    timers: Vec<Timer<A>>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
        }
    }
}

impl<A: Clone> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `action` once, `delay` after `now`.
    pub fn once(&mut self, scope: Scope, now: DateTime<Utc>, delay: Duration, action: A) -> TimerId {
        self.push(scope, now + delay.max(Duration::zero()), None, action)
    }

    /// Fire `action` every `period`, first at `now + period`.
    ///
    /// A zero period is bumped to one millisecond.
    pub fn every(&mut self, scope: Scope, now: DateTime<Utc>, period: Duration, action: A) -> TimerId {
        let period = period.max(Duration::milliseconds(1));
        self.push(scope, now + period, Some(period), action)
    }

    fn push(&mut self, scope: Scope, due: DateTime<Utc>, period: Option<Duration>, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            scope,
            due,
            period,
            action,
        });
        id
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    /// Cancel every timer owned by `scope`, returning how many were live.
    pub fn cancel_scope(&mut self, scope: Scope) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.scope != scope);
        before - self.timers.len()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn scope_len(&self, scope: Scope) -> usize {
        self.timers.iter().filter(|t| t.scope == scope).count()
    }

    /// Earliest pending due instant.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timers.iter().map(|t| t.due).min()
    }

    /// Take the earliest timer due at or before `now`. Ties go to the timer
    /// scheduled first.
    ///
    /// A one-shot timer is removed. An interval is re-armed on its period
    /// grid; periods it fell behind on are coalesced into this one firing.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Fired<A>> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;

        match self.timers[idx].period {
            None => {
                let t = self.timers.swap_remove(idx);
                Some(Fired {
                    id: t.id,
                    scope: t.scope,
                    due: t.due,
                    action: t.action,
                })
            }
            Some(period) => {
                let t = &mut self.timers[idx];
                let due = t.due;
                let period_ms = period.num_milliseconds().max(1);
                let behind_ms = (now - due).num_milliseconds();
                let skipped = behind_ms / period_ms;
                t.due = due + Duration::milliseconds(period_ms * (skipped + 1));
                Some(Fired {
                    id: t.id,
                    scope: t.scope,
                    due,
                    action: t.action.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn ms(n: i64) -> Duration {
        Duration::milliseconds(n)
    }

    fn drain(s: &mut Scheduler<&'static str>, now: DateTime<Utc>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(f) = s.pop_due(now) {
            out.push(f.action);
        }
        out
    }

    #[test]
    fn once_fires_a_single_time() {
        let mut s = Scheduler::new();
        s.once(Scope::Phase(Phase::Loading), t0(), ms(100), "go");
        assert!(drain(&mut s, t0() + ms(99)).is_empty());
        assert_eq!(drain(&mut s, t0() + ms(100)), ["go"]);
        assert!(drain(&mut s, t0() + ms(1000)).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn fires_in_due_order_then_schedule_order() {
        let mut s = Scheduler::new();
        let scope = Scope::Phase(Phase::Loading);
        s.once(scope, t0(), ms(20), "c");
        s.once(scope, t0(), ms(10), "a");
        s.once(scope, t0(), ms(10), "b");
        assert_eq!(drain(&mut s, t0() + ms(20)), ["a", "b", "c"]);
    }

    #[test]
    fn negative_delay_is_clamped_to_now() {
        let mut s = Scheduler::new();
        let scope = Scope::Phase(Phase::Loading);
        s.once(scope, t0(), ms(0), "first");
        s.once(scope, t0(), ms(-5), "late");
        assert_eq!(s.next_due(), Some(t0()));
        assert!(drain(&mut s, t0() - ms(1)).is_empty());
        assert_eq!(drain(&mut s, t0()), ["first", "late"]);
    }

    #[test]
    fn interval_rearms_on_grid() {
        let mut s = Scheduler::new();
        s.every(Scope::Letter, t0(), ms(30), "tick");
        assert_eq!(drain(&mut s, t0() + ms(30)), ["tick"]);
        assert_eq!(drain(&mut s, t0() + ms(59)), Vec::<&str>::new());
        assert_eq!(drain(&mut s, t0() + ms(60)), ["tick"]);
        assert_eq!(s.next_due(), Some(t0() + ms(90)));
    }

    #[test]
    fn interval_coalesces_missed_periods() {
        let mut s = Scheduler::new();
        s.every(Scope::Letter, t0(), ms(10), "tick");
        assert_eq!(drain(&mut s, t0() + ms(95)), ["tick"]);
        assert_eq!(s.next_due(), Some(t0() + ms(100)));
    }

    #[test]
    fn cancel_scope_only_touches_that_scope() {
        let mut s = Scheduler::new();
        s.every(Scope::Phase(Phase::Loading), t0(), ms(10), "loading");
        s.once(Scope::Phase(Phase::Loading), t0(), ms(50), "lock");
        s.every(Scope::Letter, t0(), ms(10), "letter");
        assert_eq!(s.cancel_scope(Scope::Phase(Phase::Loading)), 2);
        assert_eq!(drain(&mut s, t0() + ms(10)), ["letter"]);
    }

    #[test]
    fn cancel_single_timer() {
        let mut s = Scheduler::new();
        let id = s.once(Scope::Letter, t0(), ms(10), "x");
        assert!(s.is_live(id));
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(drain(&mut s, t0() + ms(10)).is_empty());
    }
}
