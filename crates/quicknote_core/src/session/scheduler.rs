//! Debounce and fallback-interval autosave scheduling.
//!
//! # Responsibility
//! - Track the quiet-period deadline restarted by every edit.
//! - Track the fixed-interval fallback deadline.
//! - Fire due triggers in deadline order through an injected reconcile
//!   callback.
//!
//! # Invariants
//! - Any number of edits inside one quiet period yield one debounce fire.
//! - The scheduler never runs two callbacks at once; `poll` drives them one
//!   after another and stops at the first error.
//! - Missed interval periods are not replayed; one fire catches up.

use crate::session::editing::ReconcileTrigger;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Quiet period used by both editing surfaces.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(700);
/// Fallback autosave period of the composer surface.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Timing policy for one editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    quiet_period: Duration,
    interval: Option<Duration>,
}

impl AutosavePolicy {
    /// Builds a policy; a zero `interval` disables the fallback timer.
    pub fn new(quiet_period: Duration, interval: Option<Duration>) -> Self {
        Self {
            quiet_period,
            interval: interval.filter(|period| !period.is_zero()),
        }
    }

    /// Note detail screen: debounce only.
    pub fn detail() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, None)
    }

    /// New-note composer: debounce plus fallback interval.
    pub fn composer() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, Some(DEFAULT_AUTOSAVE_INTERVAL))
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self::detail()
    }
}

/// Deadline bookkeeping for debounce and interval autosave.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    policy: AutosavePolicy,
    debounce_due: Option<DateTime<Utc>>,
    interval_due: Option<DateTime<Utc>>,
}

impl AutosaveScheduler {
    /// Creates a scheduler and arms the interval timer relative to `now`.
    pub fn new(policy: AutosavePolicy, now: DateTime<Utc>) -> Self {
        let interval_due = policy.interval.map(|period| deadline(now, period));
        Self {
            policy,
            debounce_due: None,
            interval_due,
        }
    }

    pub fn policy(&self) -> AutosavePolicy {
        self.policy
    }

    /// Restarts the quiet-period countdown.
    pub fn note_edit(&mut self, now: DateTime<Utc>) {
        self.debounce_due = Some(deadline(now, self.policy.quiet_period));
    }

    /// Deadline of the pending debounce, if an edit is waiting.
    pub fn pending_debounce(&self) -> Option<DateTime<Utc>> {
        self.debounce_due
    }

    /// Earliest armed deadline, used by hosts to schedule their next tick.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match (self.debounce_due, self.interval_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fires every trigger due at `now`, in deadline order.
    ///
    /// Each timer is cleared (debounce) or re-armed (interval) before its
    /// callback runs, so a failed reconcile waits for the next natural
    /// trigger instead of being retried in a loop.
    ///
    /// # Errors
    /// - Returns the first callback error; triggers after it stay due.
    pub fn poll<T, E>(
        &mut self,
        now: DateTime<Utc>,
        mut reconcile: impl FnMut(ReconcileTrigger) -> Result<T, E>,
    ) -> Result<Vec<T>, E> {
        let mut due = Vec::with_capacity(2);
        if let Some(at) = self.debounce_due.filter(|at| *at <= now) {
            due.push((at, ReconcileTrigger::Debounce));
        }
        if let Some(at) = self.interval_due.filter(|at| *at <= now) {
            due.push((at, ReconcileTrigger::Interval));
        }
        due.sort_by_key(|(at, _)| *at);

        let mut fired = Vec::with_capacity(due.len());
        for (at, trigger) in due {
            match trigger {
                ReconcileTrigger::Debounce => self.debounce_due = None,
                ReconcileTrigger::Interval => self.rearm_interval(at, now),
                ReconcileTrigger::Exit => {}
            }
            fired.push(reconcile(trigger)?);
        }
        Ok(fired)
    }

    /// Runs the exit reconcile regardless of pending deadlines.
    ///
    /// Timers are left armed; callers disarm them with `cancel` once the exit
    /// succeeded, so a failed exit keeps autosave running.
    pub fn flush_exit<T, E>(
        &mut self,
        reconcile: impl FnOnce(ReconcileTrigger) -> Result<T, E>,
    ) -> Result<T, E> {
        reconcile(ReconcileTrigger::Exit)
    }

    /// Disarms both timers.
    pub fn cancel(&mut self) {
        self.debounce_due = None;
        self.interval_due = None;
    }

    fn rearm_interval(&mut self, fired_at: DateTime<Utc>, now: DateTime<Utc>) {
        let Some(period) = self.policy.interval else {
            self.interval_due = None;
            return;
        };
        let mut next = deadline(fired_at, period);
        if next <= now {
            next = deadline(now, period);
        }
        self.interval_due = Some(next);
    }
}

fn deadline(from: DateTime<Utc>, after: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(after)
        .ok()
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::{AutosavePolicy, AutosaveScheduler};
    use crate::session::editing::ReconcileTrigger;
    use chrono::{DateTime, TimeZone, Utc};
    use std::convert::Infallible;
    use std::time::Duration;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn fire(scheduler: &mut AutosaveScheduler, now_ms: i64) -> Vec<ReconcileTrigger> {
        scheduler
            .poll(at(now_ms), |trigger| Ok::<_, Infallible>(trigger))
            .unwrap()
    }

    #[test]
    fn rapid_edits_collapse_into_one_debounce() {
        let mut scheduler = AutosaveScheduler::new(AutosavePolicy::detail(), at(0));
        for ms in [0, 100, 200, 300, 400] {
            scheduler.note_edit(at(ms));
            assert!(fire(&mut scheduler, ms).is_empty());
        }
        assert!(fire(&mut scheduler, 1_099).is_empty());
        assert_eq!(fire(&mut scheduler, 1_100), vec![ReconcileTrigger::Debounce]);
        assert!(fire(&mut scheduler, 5_000).is_empty());
    }

    #[test]
    fn interval_fires_without_edits_and_rearms() {
        let policy = AutosavePolicy::new(Duration::from_millis(700), Some(Duration::from_secs(5)));
        let mut scheduler = AutosaveScheduler::new(policy, at(0));
        assert!(fire(&mut scheduler, 4_999).is_empty());
        assert_eq!(fire(&mut scheduler, 5_000), vec![ReconcileTrigger::Interval]);
        assert_eq!(scheduler.next_deadline(), Some(at(10_000)));
        // Long stall: a single catch-up fire, then re-armed from now.
        assert_eq!(fire(&mut scheduler, 31_000), vec![ReconcileTrigger::Interval]);
        assert_eq!(scheduler.next_deadline(), Some(at(36_000)));
    }

    #[test]
    fn due_triggers_fire_in_deadline_order() {
        let mut scheduler = AutosaveScheduler::new(AutosavePolicy::composer(), at(0));
        scheduler.note_edit(at(4_500));
        assert_eq!(
            fire(&mut scheduler, 6_000),
            vec![ReconcileTrigger::Interval, ReconcileTrigger::Debounce]
        );
    }

    #[test]
    fn failed_callback_clears_debounce_and_stops_poll() {
        let mut scheduler = AutosaveScheduler::new(AutosavePolicy::composer(), at(0));
        scheduler.note_edit(at(0));
        let result: Result<Vec<()>, &str> = scheduler.poll(at(5_000), |_| Err("disk full"));
        assert_eq!(result, Err("disk full"));
        assert_eq!(scheduler.pending_debounce(), None);
        // Interval was still due and not yet consumed.
        assert_eq!(fire(&mut scheduler, 5_000), vec![ReconcileTrigger::Interval]);
    }

    #[test]
    fn zero_interval_disables_fallback() {
        let policy = AutosavePolicy::new(Duration::from_millis(700), Some(Duration::ZERO));
        assert_eq!(policy.interval(), None);
        let scheduler = AutosaveScheduler::new(policy, at(0));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn flush_exit_keeps_timers_until_cancelled() {
        let mut scheduler = AutosaveScheduler::new(AutosavePolicy::composer(), at(0));
        scheduler.note_edit(at(10));
        let trigger = scheduler
            .flush_exit(|trigger| Ok::<_, Infallible>(trigger))
            .unwrap();
        assert_eq!(trigger, ReconcileTrigger::Exit);
        assert!(scheduler.pending_debounce().is_some());
        scheduler.cancel();
        assert_eq!(scheduler.next_deadline(), None);
    }
}
