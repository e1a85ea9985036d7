//! Automation intervals and the periodic sweep
//!
//! The sweep decides which automations fire; the caller performs the effect
//! (log row and bloom) so this module stays free of scene access.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::models::{Automation, AutomationKind};

/// Minimum time between two firings of a `beacon` automation
pub const BEACON_COOLDOWN_MS: i64 = 30_000;

/// Errors from parsing an automation interval
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("empty interval")]
    Empty,
    #[error("invalid interval '{0}', expected a number with an optional s or m suffix")]
    Invalid(String),
    #[error("interval '{0}' is too large")]
    TooLarge(String),
}

/// A timer period such as `10s`, `90` (seconds) or `2m`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    ms: i64,
}

fn interval_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)(s|m)?$").expect("interval pattern is valid"))
}

impl Interval {
    pub fn as_ms(&self) -> i64 {
        self.ms
    }
}

impl FromStr for Interval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IntervalError::Empty);
        }
        let caps =
            interval_pattern().captures(s).ok_or_else(|| IntervalError::Invalid(s.to_string()))?;

        let value: i64 = caps[1].parse().map_err(|_| IntervalError::TooLarge(s.to_string()))?;
        let unit_ms = match caps.get(2).map(|m| m.as_str()) {
            Some("m") => 60_000,
            _ => 1_000,
        };
        let ms = value.checked_mul(unit_ms).ok_or_else(|| IntervalError::TooLarge(s.to_string()))?;
        Ok(Self { ms })
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ms % 60_000 == 0 && self.ms > 0 {
            write!(f, "{}m", self.ms / 60_000)
        } else {
            write!(f, "{}s", self.ms / 1_000)
        }
    }
}

/// One automation that fired during a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    /// Position in the automation list
    pub index: usize,
    pub name: String,
    pub kind: AutomationKind,
}

impl Firing {
    /// Console text for this firing
    pub fn message(&self) -> String {
        format!("Automation {} fired ({}).", self.name, self.kind)
    }
}

/// A `_last` of 0 counts as never fired.
fn elapsed_more_than(last: Option<i64>, now_ms: i64, period_ms: i64) -> bool {
    match last {
        None | Some(0) => true,
        Some(last) => now_ms.saturating_sub(last) > period_ms,
    }
}

/// Evaluate every automation at `now_ms`, stamping `_last` on those that fire.
///
/// - `timer` fires when its data parses as an interval and it has never fired
///   or strictly more than the interval has passed since it last did.
/// - `beacon` fires on the same rule with a fixed 30 s period, but only while
///   at least one beacon exists.
/// - `manual` never fires here.
pub fn evaluate(automations: &mut [Automation], beacon_count: usize, now_ms: i64) -> Vec<Firing> {
    let mut fired = Vec::new();
    for (index, automation) in automations.iter_mut().enumerate() {
        let fires = match automation.kind {
            AutomationKind::Timer => match automation.data.parse::<Interval>() {
                Ok(interval) => elapsed_more_than(automation.last_fired, now_ms, interval.as_ms()),
                Err(e) => {
                    debug!(name = %automation.name, error = %e, "timer automation skipped");
                    false
                }
            },
            AutomationKind::Beacon => {
                beacon_count > 0
                    && elapsed_more_than(automation.last_fired, now_ms, BEACON_COOLDOWN_MS)
            }
            AutomationKind::Manual => false,
        };

        if fires {
            automation.last_fired = Some(now_ms);
            fired.push(Firing { index, name: automation.name.clone(), kind: automation.kind });
        }
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;

    fn automation(name: &str, kind: AutomationKind, data: &str) -> Automation {
        Automation { name: name.to_string(), kind, data: data.to_string(), id: 1, last_fired: None }
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!("10s".parse::<Interval>().unwrap().as_ms(), 10_000);
        assert_eq!("10".parse::<Interval>().unwrap().as_ms(), 10_000);
        assert_eq!("2m".parse::<Interval>().unwrap().as_ms(), 120_000);
        assert_eq!("0s".parse::<Interval>().unwrap().as_ms(), 0);
    }

    #[test]
    fn test_parse_interval_errors() {
        assert_eq!("".parse::<Interval>(), Err(IntervalError::Empty));
        for bad in ["10h", "-5s", "1.5m", " 10s"] {
            assert!(matches!(bad.parse::<Interval>(), Err(IntervalError::Invalid(_))));
        }
        assert!(matches!(
            "99999999999999999999s".parse::<Interval>(),
            Err(IntervalError::TooLarge(_))
        ));
    }

    #[test]
    fn test_interval_display() {
        assert_eq!("120s".parse::<Interval>().unwrap().to_string(), "2m");
        assert_eq!("45".parse::<Interval>().unwrap().to_string(), "45s");
    }

    #[test]
    fn test_timer_fires_at_most_once_per_window() {
        let mut list = vec![automation("tick", AutomationKind::Timer, "10s")];
        let mut firings = 0;
        let mut last_fire: Option<i64> = None;
        // Sweep every 2.5 s for two minutes
        for step in 0..=48 {
            let now = 1_000_000 + step * 2_500;
            let fired = evaluate(&mut list, 0, now);
            if !fired.is_empty() {
                if let Some(prev) = last_fire {
                    assert!(now - prev > 10_000);
                }
                last_fire = Some(now);
                firings += 1;
            }
        }
        // Fires at 0, 12.5, 25, ... 112.5 s
        assert_eq!(firings, 10);
    }

    #[test]
    fn test_timer_with_bad_data_never_fires() {
        let mut list = vec![
            automation("empty", AutomationKind::Timer, ""),
            automation("junk", AutomationKind::Timer, "soon"),
            automation("padded", AutomationKind::Timer, "10s "),
        ];
        assert!(evaluate(&mut list, 5, 100).is_empty());
        assert!(list.iter().all(|a| a.last_fired.is_none()));
    }

    #[test]
    fn test_beacon_needs_beacons_and_cooldown() {
        let mut list = vec![automation("watch", AutomationKind::Beacon, "")];
        assert!(evaluate(&mut list, 0, 0).is_empty());

        let fired = evaluate(&mut list, 1, 1_000);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].message(), "Automation watch fired (beacon).");
        assert_eq!(list[0].last_fired, Some(1_000));

        assert!(evaluate(&mut list, 1, 31_000).is_empty());
        assert_eq!(evaluate(&mut list, 1, 31_001).len(), 1);
    }

    #[test]
    fn test_manual_never_fires() {
        let mut list = vec![automation("button", AutomationKind::Manual, "1s")];
        for now in [0, 10_000, 1_000_000] {
            assert!(evaluate(&mut list, 3, now).is_empty());
        }
    }

    #[test]
    fn test_firing_reports_index() {
        let mut list = vec![
            automation("a", AutomationKind::Manual, ""),
            automation("b", AutomationKind::Timer, "1s"),
        ];
        let fired = evaluate(&mut list, 0, 0);
        assert_eq!(fired, vec![Firing { index: 1, name: "b".into(), kind: AutomationKind::Timer }]);
        assert_eq!(fired[0].message(), "Automation b fired (timer).");
    }

    #[test]
    fn test_zero_last_counts_as_never_fired() {
        let mut list = vec![automation("tick", AutomationKind::Timer, "10s")];
        list[0].last_fired = Some(0);
        assert_eq!(evaluate(&mut list, 0, 5_000).len(), 1);
        assert_eq!(list[0].last_fired, Some(5_000));
    }

    #[test]
    fn test_extreme_last_does_not_overflow() {
        let mut list = vec![
            automation("past", AutomationKind::Timer, "10s"),
            automation("future", AutomationKind::Beacon, ""),
        ];
        list[0].last_fired = Some(i64::MIN);
        list[1].last_fired = Some(i64::MAX);

        let fired = evaluate(&mut list, 1, 1_700_000_000_000);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].name, "past");
        assert_eq!(list[1].last_fired, Some(i64::MAX));
    }
}
