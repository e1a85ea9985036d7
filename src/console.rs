//! The visible event log
//!
//! A bounded list of timestamped rows. Every row is also emitted through
//! `tracing` so headless runs keep a record of what the dashboard said.

use std::collections::VecDeque;
use std::fmt;

use chrono::{Local, TimeZone};
use tracing::{info, warn};

/// Rows kept before the oldest is dropped
pub const CONSOLE_CAPACITY: usize = 120;

/// Filler lines for the console ticker, with their levels
pub const PHRASES: [(&str, Level); 8] = [
    ("Handshake established", Level::Ok),
    ("Collecting small truths…", Level::Info),
    ("Staring into the void (politely)", Level::Info),
    ("Recalibrating optimism… failed", Level::Warn),
    ("Allocating vibes", Level::Ok),
    ("Spinning up imagination engine", Level::Ok),
    ("Suppressing chaos (best-effort)", Level::Info),
    ("Reality check: still reality", Level::Warn),
];

/// Row severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Ok,
    Warn,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Ok => "ok",
            Level::Warn => "warn",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One console row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the row was added, in epoch milliseconds
    pub at_ms: i64,
    pub message: String,
    pub level: Level,
}

impl LogEntry {
    /// Local wall-clock time of the row, `HH:MM:SS`
    pub fn time_label(&self) -> String {
        local_time(self.at_ms, "%H:%M:%S")
    }
}

/// Format an epoch-millisecond instant in the local time zone.
pub fn local_time(at_ms: i64, format: &str) -> String {
    match Local.timestamp_millis_opt(at_ms).single() {
        Some(t) => t.format(format).to_string(),
        None => String::from("--:--"),
    }
}

/// Bounded log of rows, oldest first
#[derive(Debug, Clone)]
pub struct Console {
    rows: VecDeque<LogEntry>,
    capacity: usize,
    pushed: u64,
}

impl Default for Console {
    fn default() -> Self {
        Self::with_capacity(CONSOLE_CAPACITY)
    }
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { rows: VecDeque::with_capacity(capacity), capacity, pushed: 0 }
    }

    /// Append a row, dropping the oldest beyond capacity.
    pub fn push(&mut self, at_ms: i64, message: impl Into<String>, level: Level) {
        let message = message.into();
        match level {
            Level::Warn => warn!(target: "clawdbot::console", "{}", message),
            Level::Ok | Level::Info => {
                info!(target: "clawdbot::console", level = level.as_str(), "{}", message)
            }
        }
        self.rows.push_back(LogEntry { at_ms, message, level });
        while self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
        self.pushed += 1;
    }

    pub fn rows(&self) -> impl Iterator<Item = &LogEntry> {
        self.rows.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.rows.back()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total rows ever pushed; a cursor for [`Console::since`]
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Rows pushed after `cursor` that are still retained.
    pub fn since(&self, cursor: u64) -> impl Iterator<Item = &LogEntry> {
        let fresh = self.pushed.saturating_sub(cursor).min(self.rows.len() as u64) as usize;
        self.rows.iter().skip(self.rows.len() - fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let mut console = Console::new();
        for i in 0..130 {
            console.push(i, format!("row {}", i), Level::Info);
        }
        assert_eq!(console.len(), CONSOLE_CAPACITY);
        assert_eq!(console.rows().next().unwrap().message, "row 10");
        assert_eq!(console.last().unwrap().message, "row 129");
        assert_eq!(console.pushed(), 130);
    }

    #[test]
    fn test_since_cursor() {
        let mut console = Console::with_capacity(3);
        console.push(0, "a", Level::Ok);
        let cursor = console.pushed();
        console.push(0, "b", Level::Warn);
        console.push(0, "c", Level::Info);
        let fresh: Vec<&str> = console.since(cursor).map(|r| r.message.as_str()).collect();
        assert_eq!(fresh, vec!["b", "c"]);

        // Rows already evicted are skipped
        for m in ["d", "e", "f", "g"] {
            console.push(0, m, Level::Info);
        }
        let fresh: Vec<&str> = console.since(cursor).map(|r| r.message.as_str()).collect();
        assert_eq!(fresh, vec!["e", "f", "g"]);
        assert_eq!(console.since(console.pushed()).count(), 0);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::Ok.to_string(), "ok");
        assert_eq!(Level::Warn.as_str(), "warn");
        assert_eq!(PHRASES.iter().filter(|(_, l)| *l == Level::Warn).count(), 2);
    }

    #[test]
    fn test_time_label_shape() {
        let entry = LogEntry { at_ms: 0, message: String::new(), level: Level::Info };
        let label = entry.time_label();
        assert_eq!(label.len(), 8);
        assert_eq!(label.matches(':').count(), 2);
    }
}
