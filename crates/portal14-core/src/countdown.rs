//! Countdown and elapsed-time decomposition.
//!
//! Both values are pure functions of two instants. They are re-derived on
//! every refresh tick and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Time remaining until the unlock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Countdown {
    /// Clamped difference in milliseconds.
    pub diff: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
}

impl Countdown {
    /// Countdown from `now` to `target`, zero once the target has passed.
    pub fn until(now: DateTime<Utc>, target: DateTime<Utc>) -> Self {
        Self::from_millis(clamped_millis(now, target))
    }

    /// Decompose a millisecond span.
    pub fn from_millis(diff: u64) -> Self {
        let milliseconds = diff % 1000;
        let total_seconds = diff / 1000;
        let seconds = total_seconds % 60;
        let total_minutes = total_seconds / 60;
        let minutes = total_minutes % 60;
        let total_hours = total_minutes / 60;
        let hours = total_hours % 24;
        let days = total_hours / 24;
        Self {
            diff,
            days,
            hours,
            minutes,
            seconds,
            milliseconds,
        }
    }

    /// True once the unlock instant has been reached.
    pub fn is_complete(&self) -> bool {
        self.diff == 0
    }

    /// Recompose the decomposed fields into milliseconds.
    pub fn total_millis(&self) -> u64 {
        self.days * MS_PER_DAY
            + self.hours * MS_PER_HOUR
            + self.minutes * MS_PER_MINUTE
            + self.seconds * MS_PER_SECOND
            + self.milliseconds
    }

    /// `DD:HH:MM:SS.mmm`, the way the loading panel prints it.
    pub fn display(&self) -> String {
        format!(
            "{}:{}:{}:{}.{}",
            pad(self.days, 2),
            pad(self.hours, 2),
            pad(self.minutes, 2),
            pad(self.seconds, 2),
            pad(self.milliseconds, 3)
        )
    }
}

/// Time spent together since the relationship start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Elapsed {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Elapsed {
    /// Elapsed time from `start` to `now`, zero when `start` is in the future.
    pub fn since(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let c = Countdown::from_millis(clamped_millis(start, now));
        Self {
            days: c.days,
            hours: c.hours,
            minutes: c.minutes,
            seconds: c.seconds,
        }
    }
}

/// Zero-pad a number to `width` digits.
pub fn pad(value: u64, width: usize) -> String {
    format!("{value:0width$}")
}

fn clamped_millis(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let ms = to.signed_duration_since(from).num_milliseconds();
    u64::try_from(ms).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn target() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap()
    }

    #[test]
    fn one_hour_before_target() {
        let now = target() - Duration::hours(1);
        let c = Countdown::until(now, target());
        assert_eq!(c.diff, 3_600_000);
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (0, 1, 0, 0));
        assert_eq!(c.milliseconds, 0);
    }

    #[test]
    fn after_target_clamps_to_zero() {
        let c = Countdown::until(target() + Duration::days(3), target());
        assert_eq!(c, Countdown::default());
        assert!(c.is_complete());
    }

    #[test]
    fn exactly_at_target_is_complete() {
        assert!(Countdown::until(target(), target()).is_complete());
    }

    #[test]
    fn display_pads_fields() {
        let c = Countdown::from_millis(MS_PER_DAY * 3 + MS_PER_HOUR * 4 + 5 * MS_PER_SECOND + 7);
        assert_eq!(c.display(), "03:04:00:05.007");
    }

    #[test]
    fn elapsed_since_start() {
        let start = Utc.with_ymd_and_hms(2023, 2, 14, 0, 0, 0).unwrap();
        let now = start + Duration::days(1096) + Duration::minutes(90) + Duration::seconds(12);
        let e = Elapsed::since(start, now);
        assert_eq!(
            e,
            Elapsed {
                days: 1096,
                hours: 1,
                minutes: 30,
                seconds: 12
            }
        );
    }

    #[test]
    fn elapsed_before_start_is_zero() {
        let start = target();
        assert_eq!(Elapsed::since(start, start - Duration::days(1)), Elapsed::default());
    }

    proptest! {
        #[test]
        fn diff_matches_span_before_target(before_ms in 0i64..400 * 86_400_000) {
            let now = target() - Duration::milliseconds(before_ms);
            let c = Countdown::until(now, target());
            prop_assert_eq!(c.diff, before_ms as u64);
            prop_assert_eq!(c.total_millis(), c.diff);
            prop_assert!(c.hours < 24 && c.minutes < 60 && c.seconds < 60 && c.milliseconds < 1000);
        }

        #[test]
        fn diff_is_zero_after_target(after_ms in 0i64..400 * 86_400_000) {
            let c = Countdown::until(target() + Duration::milliseconds(after_ms), target());
            prop_assert_eq!(c, Countdown::default());
        }
    }
}
