//! Deterministic replay on a virtual clock.
//!
//! Time advances in fixed steps instead of following the wall clock, decoys
//! come from a seeded generator and the flag lives in memory, so the same
//! arguments always print the same event stream.

use chrono::Duration;
use clap::Args;
use portal14_core::{Config, Event, MemoryStore, Phase, PhaseController, SeededSource};

use super::{environment, parse_now};

#[derive(Args)]
pub struct SimulateArgs {
    /// Shorten every animation, as with a reduced-motion preference
    #[arg(long)]
    pub reduced_motion: bool,
    /// Behave like a touch device
    #[arg(long)]
    pub touch: bool,
    /// Seed for the decoy generator
    #[arg(long, default_value_t = 14)]
    pub seed: u64,
    /// Virtual clock step in milliseconds
    #[arg(long, default_value_t = 10)]
    pub step_ms: u64,
    /// Stop after this many virtual milliseconds
    #[arg(long, default_value_t = 20_000)]
    pub until_ms: u64,
    /// Accept the invitation at this offset, once the question is showing
    #[arg(long)]
    pub accept_at_ms: Option<u64>,
    /// Open the letter as soon as it unlocks
    #[arg(long)]
    pub open_letter: bool,
    /// Start as if the invitation had already been accepted
    #[arg(long)]
    pub accepted: bool,
    /// Start the virtual clock at this instant (RFC 3339)
    #[arg(long)]
    pub now: Option<String>,
    /// Include refresh ticks (countdown, decoys, scan, typing) in the output
    #[arg(long)]
    pub ticks: bool,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.step_ms == 0 {
        return Err("--step-ms must be at least 1".into());
    }
    let config = Config::load_or_default();
    let env = environment(&config.accessibility, args.reduced_motion, args.touch);
    let store = if args.accepted {
        MemoryStore::with(&config.experience.accepted_key, "true")
    } else {
        MemoryStore::new()
    };
    let mut ctl = PhaseController::from_config(&config, env, store, SeededSource::new(args.seed))?;

    let t0 = parse_now(args.now.as_deref())?;
    let step = Duration::milliseconds(i64::try_from(args.step_ms)?);
    let until = t0 + Duration::milliseconds(i64::try_from(args.until_ms)?);
    let accept_at = args
        .accept_at_ms
        .map(|ms| i64::try_from(ms).map(|ms| t0 + Duration::milliseconds(ms)))
        .transpose()?;

    let mut out = Emitter { ticks: args.ticks };
    out.emit(&ctl.start(t0))?;

    let mut accepted = false;
    let mut opened = false;
    let mut t = t0;
    while t < until {
        t = (t + step).min(until);
        out.emit(&ctl.advance(t))?;

        if !accepted && ctl.phase() == Phase::Question && accept_at.is_some_and(|at| t >= at) {
            accepted = true;
            out.emit(&ctl.accept(t))?;
        }
        if args.open_letter && !opened && ctl.is_letter_unlocked() {
            opened = true;
            out.emit(&ctl.toggle_letter(t))?;
        }
    }

    tracing::debug!(pending = ctl.pending_timers(), phase = %ctl.phase(), "simulation finished");
    ctl.teardown();
    Ok(())
}

struct Emitter {
    ticks: bool,
}

impl Emitter {
    fn emit(&mut self, events: &[Event]) -> Result<(), serde_json::Error> {
        for event in events.iter().filter(|e| self.ticks || !e.is_tick()) {
            println!("{}", serde_json::to_string(event)?);
        }
        Ok(())
    }
}
