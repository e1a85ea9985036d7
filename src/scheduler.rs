//! Periodic tasks against a single clock
//!
//! Each registered task has a period and a next deadline. [`Scheduler::due`]
//! reports every task whose deadline has passed exactly once, however many
//! periods were missed, and moves its deadline past `now`.

/// A task registered with its period
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry<T> {
    task: T,
    period_ms: i64,
    next_ms: i64,
}

/// Interval timers keyed by a task tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Copy + PartialEq> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` to first run one period after `now_ms`.
    ///
    /// Registering the same task again replaces its period and deadline.
    pub fn register(&mut self, task: T, period_ms: i64, now_ms: i64) {
        let period_ms = period_ms.max(1);
        let entry = Entry { task, period_ms, next_ms: now_ms + period_ms };
        match self.entries.iter_mut().find(|e| e.task == task) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Period of a registered task
    pub fn period(&self, task: T) -> Option<i64> {
        self.entries.iter().find(|e| e.task == task).map(|e| e.period_ms)
    }

    /// Tasks due at `now_ms`, in registration order.
    pub fn due(&mut self, now_ms: i64) -> Vec<T> {
        let mut fired = Vec::new();
        for entry in &mut self.entries {
            if entry.next_ms <= now_ms {
                let missed = (now_ms - entry.next_ms) / entry.period_ms + 1;
                entry.next_ms += missed * entry.period_ms;
                fired.push(entry.task);
            }
        }
        fired
    }
}
