use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, Elapsed};
use crate::decoy::ClockFace;
use crate::evasion::Point;
use crate::phase::Phase;

/// What a shake animation is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShakeTarget {
    /// Loading date panel, on detection.
    Date,
    /// Scan name, once resolved.
    Scan,
    /// The No control on touch devices.
    NoButton,
}

/// Every state change in the controller produces an Event.
/// Front ends render from them; nothing else listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PhaseEntered {
        phase: Phase,
        from: Option<Phase>,
        at: DateTime<Utc>,
    },
    CountdownTick {
        countdown: Countdown,
        at: DateTime<Utc>,
    },
    ElapsedTick {
        elapsed: Elapsed,
        at: DateTime<Utc>,
    },
    DecoyClock {
        clock: ClockFace,
        at: DateTime<Utc>,
    },
    DecoyDate {
        date: String,
        at: DateTime<Utc>,
    },
    /// The decoys froze to the real time and date.
    DecoyLocked {
        clock: ClockFace,
        date: String,
        at: DateTime<Utc>,
    },
    DateFinalized {
        at: DateTime<Utc>,
    },
    ShakeStarted {
        target: ShakeTarget,
        at: DateTime<Utc>,
    },
    ShakeEnded {
        target: ShakeTarget,
        at: DateTime<Utc>,
    },
    ScanTick {
        display: String,
        revealed: usize,
        at: DateTime<Utc>,
    },
    ScanResolved {
        name: String,
        at: DateTime<Utc>,
    },
    /// The No control slid away from the pointer.
    NoEvaded {
        position: Point,
        at: DateTime<Utc>,
    },
    AcceptRecorded {
        /// False when the flag store refused the write.
        persisted: bool,
        at: DateTime<Utc>,
    },
    LetterUnlocked {
        at: DateTime<Utc>,
    },
    LetterOpened {
        at: DateTime<Utc>,
    },
    LetterClosed {
        at: DateTime<Utc>,
    },
    LetterTyped {
        typed_length: usize,
        total: usize,
        at: DateTime<Utc>,
    },
    ReducedMotionChanged {
        reduced_motion: bool,
        at: DateTime<Utc>,
    },
    PointerChanged {
        coarse_pointer: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// High-frequency refresh events, usually filtered out of logs.
    pub fn is_tick(&self) -> bool {
        matches!(
            self,
            Event::CountdownTick { .. }
                | Event::ElapsedTick { .. }
                | Event::DecoyClock { .. }
                | Event::DecoyDate { .. }
                | Event::ScanTick { .. }
                | Event::LetterTyped { .. }
        )
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::PhaseEntered { at, .. }
            | Event::CountdownTick { at, .. }
            | Event::ElapsedTick { at, .. }
            | Event::DecoyClock { at, .. }
            | Event::DecoyDate { at, .. }
            | Event::DecoyLocked { at, .. }
            | Event::DateFinalized { at }
            | Event::ShakeStarted { at, .. }
            | Event::ShakeEnded { at, .. }
            | Event::ScanTick { at, .. }
            | Event::ScanResolved { at, .. }
            | Event::NoEvaded { at, .. }
            | Event::AcceptRecorded { at, .. }
            | Event::LetterUnlocked { at }
            | Event::LetterOpened { at }
            | Event::LetterClosed { at }
            | Event::LetterTyped { at, .. }
            | Event::ReducedMotionChanged { at, .. }
            | Event::PointerChanged { at, .. } => *at,
        }
    }
}
