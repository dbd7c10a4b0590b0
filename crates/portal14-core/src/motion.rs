//! Timer durations, normal and reduced-motion.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Every duration the controller schedules, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub countdown_refresh_ms: i64,
    pub decoy_clock_ms: i64,
    pub decoy_date_ms: i64,
    pub decoy_lock_ms: i64,
    pub date_shake_ms: i64,
    pub date_finalize_ms: i64,
    pub loading_ms: i64,
    pub scan_tick_ms: i64,
    pub scan_shake_ms: i64,
    pub scan_ms: i64,
    pub sync_ms: i64,
    pub jiggle_ms: i64,
    pub elapsed_refresh_ms: i64,
    pub letter_tick_ms: i64,
}

impl MotionProfile {
    pub const NORMAL: Self = Self {
        countdown_refresh_ms: 33,
        decoy_clock_ms: 220,
        decoy_date_ms: 260,
        decoy_lock_ms: 3200,
        date_shake_ms: 600,
        date_finalize_ms: 500,
        loading_ms: 6200,
        scan_tick_ms: 70,
        scan_shake_ms: 600,
        scan_ms: 5200,
        sync_ms: 5200,
        jiggle_ms: 520,
        elapsed_refresh_ms: 1000,
        letter_tick_ms: 34,
    };

    /// Same end state, all one-shot delays collapsed to zero and slower
    /// refresh cadences.
    pub const REDUCED: Self = Self {
        countdown_refresh_ms: 200,
        decoy_clock_ms: 300,
        decoy_date_ms: 450,
        decoy_lock_ms: 0,
        date_shake_ms: 0,
        date_finalize_ms: 0,
        loading_ms: 0,
        scan_tick_ms: 30,
        scan_shake_ms: 0,
        scan_ms: 0,
        sync_ms: 0,
        jiggle_ms: 0,
        elapsed_refresh_ms: 1000,
        letter_tick_ms: 10,
    };

    pub fn for_preference(reduced_motion: bool) -> Self {
        if reduced_motion {
            Self::REDUCED
        } else {
            Self::NORMAL
        }
    }
}

/// Shorthand for building chrono durations from profile fields.
pub(crate) fn ms(value: i64) -> Duration {
    Duration::milliseconds(value)
}
