//! Randomized decoy values shown before the loading panel "detects" the
//! real date and time.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::countdown::pad;

/// Source of uniform random integers for decoys and the scan scramble.
///
/// Injected so tests and simulations can be deterministic.
pub trait DecoySource {
    /// Uniform value in `0..bound`. `bound` is never zero.
    fn below(&mut self, bound: u32) -> u32;
}

/// Thread-local RNG, used by the interactive front end.
#[derive(Debug, Default)]
pub struct ThreadSource;

impl DecoySource for ThreadSource {
    fn below(&mut self, bound: u32) -> u32 {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Seeded PCG generator for reproducible runs.
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: Mcg128Xsl64,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl DecoySource for SeededSource {
    fn below(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound)
    }
}

impl<S: DecoySource + ?Sized> DecoySource for Box<S> {
    fn below(&mut self, bound: u32) -> u32 {
        (**self).below(bound)
    }
}

/// Wall-clock face displayed by the loading panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockFace {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub milliseconds: u32,
}

impl ClockFace {
    pub const fn new(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            milliseconds,
        }
    }

    /// `HH:MM:SS.mmm`
    pub fn display(&self) -> String {
        format!(
            "{}:{}:{}.{}",
            pad(self.hours.into(), 2),
            pad(self.minutes.into(), 2),
            pad(self.seconds.into(), 2),
            pad(self.milliseconds.into(), 3)
        )
    }
}

/// Clock face the decoy freezes to once locked.
pub const LOCKED_TIME: ClockFace = ClockFace::new(19, 0, 0, 0);

/// A random time of day.
pub fn random_clock(src: &mut dyn DecoySource) -> ClockFace {
    ClockFace {
        hours: src.below(24),
        minutes: src.below(60),
        seconds: src.below(60),
        milliseconds: src.below(1000),
    }
}

/// A random `DD/MM/YY` date with day 1..=28, month 1..=12, year 24..=29.
pub fn random_date(src: &mut dyn DecoySource) -> String {
    let day = src.below(28) + 1;
    let month = src.below(12) + 1;
    let year = src.below(6) + 24;
    format!(
        "{}/{}/{}",
        pad(day.into(), 2),
        pad(month.into(), 2),
        pad(year.into(), 2)
    )
}
