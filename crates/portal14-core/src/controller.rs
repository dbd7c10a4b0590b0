//! Phase controller.
//!
//! The controller is a wall-clock-driven state machine over [`Phase`]. Like
//! the rest of the core it owns no thread: the caller feeds it the current
//! instant through [`PhaseController::advance`] and user input through the
//! other commands, and every call returns the [`Event`]s it produced.
//!
//! ## State Transitions
//!
//! ```text
//! Loading -> Scan -> Sync -> Question -> Accepted
//!   (timed)  (timed)  (timed)  (accept)   (terminal)
//! ```
//!
//! The initial phase is `Accepted` when the persisted flag is set, otherwise
//! `Loading`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut ctl = PhaseController::new(experience, env, evasive, store, rng);
//! ctl.start(now);
//! // In a loop:
//! for event in ctl.advance(Utc::now()) { render(event); }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::{Countdown, Elapsed};
use crate::decoy::{random_clock, random_date, ClockFace, DecoySource, LOCKED_TIME};
use crate::error::ValidationError;
use crate::events::{Event, ShakeTarget};
use crate::evasion::{EvasiveButton, Point};
use crate::letter::LetterTyper;
use crate::motion::{ms, MotionProfile};
use crate::phase::Phase;
use crate::scheduler::{Fired, Scheduler, Scope, TimerId};
use crate::scramble::ScrambleReveal;
use crate::storage::{AcceptedFlag, Config, ExperienceConfig, FlagStore};

/// Fixed content and calendar constants of the experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub target: DateTime<Utc>,
    pub relationship_start: DateTime<Utc>,
    pub target_date_text: String,
    /// Human form of the unlock date, e.g. "14 de Febrero".
    pub target_date_display: String,
    pub locked_time: ClockFace,
    pub scan_name: String,
    pub location_text: String,
    pub letter_text: String,
    pub accepted_key: String,
}

impl Experience {
    /// Experience with the default texts and the given instants.
    pub fn new(target: DateTime<Utc>, relationship_start: DateTime<Utc>) -> Self {
        let defaults = ExperienceConfig::default();
        Self {
            target,
            relationship_start,
            target_date_text: defaults.target_date_text,
            target_date_display: defaults.target_date_display,
            locked_time: LOCKED_TIME,
            scan_name: defaults.scan_name,
            location_text: defaults.location_text,
            letter_text: defaults.letter_text,
            accepted_key: defaults.accepted_key,
        }
    }

    /// Resolve the configured local wall times.
    pub fn from_config(cfg: &ExperienceConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            target: cfg.target_instant()?,
            relationship_start: cfg.relationship_start_instant()?,
            target_date_text: cfg.target_date_text.clone(),
            target_date_display: cfg.target_date_display.clone(),
            locked_time: cfg.locked_time,
            scan_name: cfg.scan_name.clone(),
            location_text: cfg.location_text.clone(),
            letter_text: cfg.letter_text.clone(),
            accepted_key: cfg.accepted_key.clone(),
        })
    }
}

/// Device signals the controller adapts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Environment {
    pub reduced_motion: bool,
    pub coarse_pointer: bool,
}

/// Timer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    CountdownRefresh,
    ElapsedRefresh,
    DecoyClock,
    DecoyDate,
    LockDecoy,
    FinalizeDate,
    EndShake(ShakeTarget),
    ScanScramble,
    Advance(Phase),
    TypeLetter,
}

/// Everything a front end needs to draw the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub countdown: Countdown,
    pub elapsed: Elapsed,
    pub decoy_clock: ClockFace,
    pub decoy_date: String,
    pub decoy_locked: bool,
    pub date_resolved: bool,
    pub date_finalized: bool,
    pub scan_display: String,
    pub scan_resolved: bool,
    pub shaking: Vec<ShakeTarget>,
    pub evasion_enabled: bool,
    pub no_position: Point,
    pub location: String,
    pub location_revealed: bool,
    pub letter_unlocked: bool,
    pub unlock_date: String,
    pub letter_open: bool,
    pub typed_length: usize,
    pub letter_total: usize,
    pub typed_text: String,
    pub reduced_motion: bool,
    pub coarse_pointer: bool,
    pub pending_timers: usize,
    /// Instant of the last call that touched the controller.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct LoadingState {
    clock: ClockFace,
    date: String,
    locked: bool,
    resolved: bool,
    finalized: bool,
    clock_timer: Option<TimerId>,
    date_timer: Option<TimerId>,
}

#[derive(Debug, Default)]
struct Shakes {
    date: bool,
    scan: bool,
    no_button: bool,
}

impl Shakes {
    fn set(&mut self, target: ShakeTarget, on: bool) {
        match target {
            ShakeTarget::Date => self.date = on,
            ShakeTarget::Scan => self.scan = on,
            ShakeTarget::NoButton => self.no_button = on,
        }
    }

    fn active(&self) -> Vec<ShakeTarget> {
        [
            (self.date, ShakeTarget::Date),
            (self.scan, ShakeTarget::Scan),
            (self.no_button, ShakeTarget::NoButton),
        ]
        .into_iter()
        .filter_map(|(on, t)| on.then_some(t))
        .collect()
    }
}

/// Core phase state machine.
///
/// Owns its scheduler; every timer is scoped to the phase that armed it (or
/// to the letter panel) and is cancelled when that owner goes away.
pub struct PhaseController<S: FlagStore, R: DecoySource> {
    experience: Experience,
    env: Environment,
    motion: MotionProfile,
    flag: AcceptedFlag,
    store: S,
    rng: R,
    scheduler: Scheduler<Tick>,
    phase: Phase,
    started: bool,
    torn_down: bool,
    countdown: Countdown,
    elapsed: Elapsed,
    loading: LoadingState,
    shakes: Shakes,
    scramble: ScrambleReveal,
    scan_resolved: bool,
    scramble_timer: Option<TimerId>,
    evasive: EvasiveButton,
    letter: LetterTyper,
    letter_unlocked: bool,
    last_at: Option<DateTime<Utc>>,
    outbox: Vec<Event>,
}

impl<S: FlagStore, R: DecoySource> PhaseController<S, R> {
    /// Build a controller. The persisted flag is read here, once, to pick
    /// the initial phase; nothing is scheduled until [`start`](Self::start).
    pub fn new(experience: Experience, env: Environment, evasive: EvasiveButton, store: S, rng: R) -> Self {
        let flag = AcceptedFlag::new(experience.accepted_key.clone());
        let phase = if flag.read(&store) {
            Phase::Accepted
        } else {
            Phase::Loading
        };
        let scramble = ScrambleReveal::new(&experience.scan_name);
        let letter = LetterTyper::new(experience.letter_text.clone());
        Self {
            motion: MotionProfile::for_preference(env.reduced_motion),
            experience,
            env,
            flag,
            store,
            rng,
            scheduler: Scheduler::new(),
            phase,
            started: false,
            torn_down: false,
            countdown: Countdown::default(),
            elapsed: Elapsed::default(),
            loading: LoadingState::default(),
            shakes: Shakes::default(),
            scramble,
            scan_resolved: false,
            scramble_timer: None,
            evasive,
            letter,
            letter_unlocked: false,
            last_at: None,
            outbox: Vec::new(),
        }
    }

    /// Build a controller from the application configuration.
    ///
    /// # Errors
    /// Returns an error if a configured instant does not exist in the local
    /// timezone or the evasion geometry is invalid.
    pub fn from_config(cfg: &Config, env: Environment, store: S, rng: R) -> Result<Self, ValidationError> {
        let experience = Experience::from_config(&cfg.experience)?;
        let evasive = EvasiveButton::centered(cfg.evasion.zone(), cfg.evasion.control(), cfg.evasion.params())?;
        Ok(Self::new(experience, env, evasive, store, rng))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn environment(&self) -> Environment {
        self.env
    }

    pub fn motion(&self) -> &MotionProfile {
        &self.motion
    }

    pub fn experience(&self) -> &Experience {
        &self.experience
    }

    pub fn countdown(&self) -> Countdown {
        self.countdown
    }

    pub fn elapsed(&self) -> Elapsed {
        self.elapsed
    }

    pub fn letter(&self) -> &LetterTyper {
        &self.letter
    }

    pub fn evasive(&self) -> &EvasiveButton {
        &self.evasive
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_letter_unlocked(&self) -> bool {
        self.letter_unlocked
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Live timers, across every scope.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    pub fn pending_in(&self, scope: Scope) -> usize {
        self.scheduler.scope_len(scope)
    }

    /// When the next timer is due, for callers that sleep between polls.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_due()
    }

    pub fn snapshot(&self) -> Snapshot {
        let revealed = self.phase == Phase::Accepted;
        let location = if revealed {
            self.experience.location_text.clone()
        } else {
            mask(&self.experience.location_text)
        };
        Snapshot {
            phase: self.phase,
            countdown: self.countdown,
            elapsed: self.elapsed,
            decoy_clock: self.loading.clock,
            decoy_date: self.loading.date.clone(),
            decoy_locked: self.loading.locked,
            date_resolved: self.loading.resolved,
            date_finalized: self.loading.finalized,
            scan_display: self.scramble.display().to_string(),
            scan_resolved: self.scan_resolved,
            shaking: self.shakes.active(),
            evasion_enabled: !self.env.coarse_pointer,
            no_position: self.evasive.position(),
            location,
            location_revealed: revealed,
            letter_unlocked: self.letter_unlocked,
            unlock_date: self.experience.target_date_display.clone(),
            letter_open: self.letter.is_open(),
            typed_length: self.letter.typed_length(),
            letter_total: self.letter.len(),
            typed_text: self.letter.typed_text().to_string(),
            reduced_motion: self.env.reduced_motion,
            coarse_pointer: self.env.coarse_pointer,
            pending_timers: self.scheduler.len(),
            at: self.last_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm the initial phase. Calling it again is a no-op.
    pub fn start(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if self.started || self.torn_down {
            return Vec::new();
        }
        self.started = true;
        self.last_at = Some(now);
        tracing::info!(phase = %self.phase, "experience started");
        self.outbox.push(Event::PhaseEntered {
            phase: self.phase,
            from: None,
            at: now,
        });
        self.arm_phase(now);
        self.flush()
    }

    /// Fire every timer due at or before `now`, in due order.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.started || self.torn_down {
            return Vec::new();
        }
        while let Some(fired) = self.scheduler.pop_due(now) {
            self.fire(fired);
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Accept the invitation.
    ///
    /// From `Question` this persists the flag (best effort), closes the
    /// letter panel and enters `Accepted`. From `Accepted` it only re-writes
    /// the flag. Earlier phases have no accept control and ignore it.
    pub fn accept(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.started || self.torn_down {
            return Vec::new();
        }
        match self.phase {
            Phase::Question => {
                let persisted = self.flag.write(&self.store);
                self.outbox.push(Event::AcceptRecorded { persisted, at: now });
                self.close_letter(now, false);
                self.enter(Phase::Accepted, now);
            }
            Phase::Accepted => {
                let persisted = self.flag.write(&self.store);
                self.outbox.push(Event::AcceptRecorded { persisted, at: now });
            }
            other => tracing::debug!(phase = %other, "accept ignored"),
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Press the No control. It never rejects: on touch devices it jiggles,
    /// on fine pointers it cannot be reached and does nothing.
    pub fn press_no(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.started || self.torn_down || self.phase != Phase::Question {
            return Vec::new();
        }
        if self.env.coarse_pointer {
            self.start_shake(ShakeTarget::NoButton, self.motion.jiggle_ms, now);
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Pointer moved or entered the No zone, in zone-local coordinates.
    pub fn pointer_move(&mut self, pointer: Point, now: DateTime<Utc>) -> Vec<Event> {
        if !self.started || self.torn_down || self.phase != Phase::Question || self.env.coarse_pointer {
            return Vec::new();
        }
        if self.evasive.on_pointer(pointer) {
            self.outbox.push(Event::NoEvaded {
                position: self.evasive.position(),
                at: now,
            });
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Open or close the letter panel. Only works once unlocked.
    pub fn toggle_letter(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.started || self.torn_down || self.phase != Phase::Accepted {
            return Vec::new();
        }
        if !self.letter_unlocked {
            tracing::debug!("letter still locked");
            return Vec::new();
        }
        if self.letter.is_open() {
            self.close_letter(now, true);
        } else {
            self.open_letter(now);
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Reduced-motion preference changed. The current phase is re-armed
    /// with the new durations, restarting its effects.
    pub fn set_reduced_motion(&mut self, reduced_motion: bool, now: DateTime<Utc>) -> Vec<Event> {
        if self.env.reduced_motion == reduced_motion || self.torn_down {
            return Vec::new();
        }
        self.env.reduced_motion = reduced_motion;
        self.motion = MotionProfile::for_preference(reduced_motion);
        self.outbox.push(Event::ReducedMotionChanged { reduced_motion, at: now });
        if self.started {
            self.scheduler.clear();
            self.shakes = Shakes::default();
            self.arm_phase(now);
            if self.letter.is_open() {
                self.open_letter(now);
            }
        }
        self.last_at = Some(now);
        self.flush()
    }

    /// Pointer capability changed. Coarse pointers disable evasion.
    pub fn set_coarse_pointer(&mut self, coarse_pointer: bool, now: DateTime<Utc>) -> Vec<Event> {
        if self.env.coarse_pointer == coarse_pointer || self.torn_down {
            return Vec::new();
        }
        self.env.coarse_pointer = coarse_pointer;
        self.outbox.push(Event::PointerChanged { coarse_pointer, at: now });
        self.last_at = Some(now);
        self.flush()
    }

    /// Cancel every timer. The controller ignores all input afterwards.
    pub fn teardown(&mut self) {
        let cancelled = self.scheduler.len();
        self.scheduler.clear();
        self.torn_down = true;
        tracing::debug!(cancelled, "controller torn down");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    fn enter(&mut self, next: Phase, at: DateTime<Utc>) {
        let from = self.phase;
        let cancelled = self.scheduler.cancel_scope(Scope::Phase(from));
        self.shakes = Shakes::default();
        self.phase = next;
        if next == Phase::Question {
            self.evasive.recenter();
        }
        tracing::info!(%from, to = %next, cancelled, "phase transition");
        self.outbox.push(Event::PhaseEntered {
            phase: next,
            from: Some(from),
            at,
        });
        self.arm_phase(at);
    }

    fn arm_phase(&mut self, at: DateTime<Utc>) {
        let scope = Scope::Phase(self.phase);
        let m = self.motion;
        match self.phase {
            Phase::Loading => {
                self.refresh_countdown(at);
                self.scheduler
                    .every(scope, at, ms(m.countdown_refresh_ms), Tick::CountdownRefresh);
                self.loading = LoadingState {
                    clock: random_clock(&mut self.rng),
                    date: random_date(&mut self.rng),
                    ..LoadingState::default()
                };
                self.loading.clock_timer =
                    Some(self.scheduler.every(scope, at, ms(m.decoy_clock_ms), Tick::DecoyClock));
                self.loading.date_timer =
                    Some(self.scheduler.every(scope, at, ms(m.decoy_date_ms), Tick::DecoyDate));
                self.scheduler.once(scope, at, ms(m.decoy_lock_ms), Tick::LockDecoy);
                self.scheduler
                    .once(scope, at, ms(m.loading_ms), Tick::Advance(Phase::Scan));
            }
            Phase::Scan => {
                self.scramble = ScrambleReveal::new(&self.experience.scan_name);
                self.scan_resolved = false;
                self.scramble_timer =
                    Some(self.scheduler.every(scope, at, ms(m.scan_tick_ms), Tick::ScanScramble));
                self.scheduler.once(scope, at, ms(m.scan_ms), Tick::Advance(Phase::Sync));
            }
            Phase::Sync => {
                self.scheduler
                    .once(scope, at, ms(m.sync_ms), Tick::Advance(Phase::Question));
            }
            Phase::Question => {}
            Phase::Accepted => {
                self.refresh_countdown(at);
                self.elapsed = Elapsed::since(self.experience.relationship_start, at);
                self.scheduler
                    .every(scope, at, ms(m.countdown_refresh_ms), Tick::CountdownRefresh);
                self.scheduler
                    .every(scope, at, ms(m.elapsed_refresh_ms), Tick::ElapsedRefresh);
            }
        }
    }

    fn fire(&mut self, fired: Fired<Tick>) {
        let at = fired.due;
        tracing::trace!(action = ?fired.action, scope = ?fired.scope, %at, "timer fired");
        match fired.action {
            Tick::CountdownRefresh => {
                self.refresh_countdown(at);
                self.outbox.push(Event::CountdownTick {
                    countdown: self.countdown,
                    at,
                });
            }
            Tick::ElapsedRefresh => {
                self.elapsed = Elapsed::since(self.experience.relationship_start, at);
                self.outbox.push(Event::ElapsedTick {
                    elapsed: self.elapsed,
                    at,
                });
            }
            Tick::DecoyClock => {
                if !self.loading.locked {
                    self.loading.clock = random_clock(&mut self.rng);
                    self.outbox.push(Event::DecoyClock {
                        clock: self.loading.clock,
                        at,
                    });
                }
            }
            Tick::DecoyDate => {
                if !self.loading.locked {
                    self.loading.date = random_date(&mut self.rng);
                    self.outbox.push(Event::DecoyDate {
                        date: self.loading.date.clone(),
                        at,
                    });
                }
            }
            Tick::LockDecoy => self.lock_decoy(at),
            Tick::FinalizeDate => {
                self.loading.finalized = true;
                self.outbox.push(Event::DateFinalized { at });
            }
            Tick::EndShake(target) => {
                self.shakes.set(target, false);
                self.outbox.push(Event::ShakeEnded { target, at });
            }
            Tick::ScanScramble => self.scramble_tick(at),
            Tick::Advance(next) => {
                if self.phase.timed_successor() == Some(next) {
                    self.enter(next, at);
                }
            }
            Tick::TypeLetter => {
                if self.letter.tick() {
                    self.outbox.push(Event::LetterTyped {
                        typed_length: self.letter.typed_length(),
                        total: self.letter.len(),
                        at,
                    });
                }
                if self.letter.is_complete() {
                    self.scheduler.cancel_scope(Scope::Letter);
                }
            }
        }
    }

    fn refresh_countdown(&mut self, at: DateTime<Utc>) {
        self.countdown = Countdown::until(at, self.experience.target);
        if self.phase.is_terminal() && self.countdown.is_complete() && !self.letter_unlocked {
            self.letter_unlocked = true;
            tracing::info!("letter unlocked");
            self.outbox.push(Event::LetterUnlocked { at });
        }
    }

    fn lock_decoy(&mut self, at: DateTime<Utc>) {
        if let Some(id) = self.loading.clock_timer.take() {
            self.scheduler.cancel(id);
        }
        if let Some(id) = self.loading.date_timer.take() {
            self.scheduler.cancel(id);
        }
        self.loading.locked = true;
        self.loading.resolved = true;
        self.loading.clock = self.experience.locked_time;
        self.loading.date = self.experience.target_date_text.clone();
        self.outbox.push(Event::DecoyLocked {
            clock: self.loading.clock,
            date: self.loading.date.clone(),
            at,
        });
        self.start_shake(ShakeTarget::Date, self.motion.date_shake_ms, at);
        self.scheduler.once(
            Scope::Phase(Phase::Loading),
            at,
            ms(self.motion.date_finalize_ms),
            Tick::FinalizeDate,
        );
    }

    fn scramble_tick(&mut self, at: DateTime<Utc>) {
        let display = self.scramble.tick(&mut self.rng).to_string();
        self.outbox.push(Event::ScanTick {
            display,
            revealed: self.scramble.iterations(),
            at,
        });
        if self.scramble.is_resolved() && !self.scan_resolved {
            if let Some(id) = self.scramble_timer.take() {
                self.scheduler.cancel(id);
            }
            self.scan_resolved = true;
            self.outbox.push(Event::ScanResolved {
                name: self.experience.scan_name.clone(),
                at,
            });
            self.start_shake(ShakeTarget::Scan, self.motion.scan_shake_ms, at);
        }
    }

    fn start_shake(&mut self, target: ShakeTarget, duration_ms: i64, at: DateTime<Utc>) {
        self.shakes.set(target, true);
        self.outbox.push(Event::ShakeStarted { target, at });
        self.scheduler.once(
            Scope::Phase(self.phase),
            at,
            ms(duration_ms),
            Tick::EndShake(target),
        );
    }

    fn open_letter(&mut self, at: DateTime<Utc>) {
        self.letter.open();
        self.outbox.push(Event::LetterOpened { at });
        self.arm_letter(at);
    }

    fn arm_letter(&mut self, at: DateTime<Utc>) {
        self.scheduler.cancel_scope(Scope::Letter);
        if !self.letter.is_complete() {
            self.scheduler
                .every(Scope::Letter, at, ms(self.motion.letter_tick_ms), Tick::TypeLetter);
        }
    }

    fn close_letter(&mut self, at: DateTime<Utc>, announce: bool) {
        self.scheduler.cancel_scope(Scope::Letter);
        let was_open = self.letter.is_open();
        self.letter.close();
        if announce && was_open {
            self.outbox.push(Event::LetterClosed { at });
        }
    }
}

fn mask(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { c } else { '#' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoy::SeededSource;
    use crate::evasion::{EvasionParams, Size};
    use crate::storage::{MemoryStore, UnavailableStore};
    use chrono::{Duration, TimeZone};

    fn target() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap()
    }

    fn experience() -> Experience {
        Experience::new(target(), Utc.with_ymd_and_hms(2023, 2, 14, 0, 0, 0).unwrap())
    }

    fn evasive() -> EvasiveButton {
        EvasiveButton::centered(Size::new(320.0, 200.0), Size::new(80.0, 40.0), EvasionParams::default()).unwrap()
    }

    fn controller<S: FlagStore>(store: S, env: Environment) -> PhaseController<S, SeededSource> {
        PhaseController::new(experience(), env, evasive(), store, SeededSource::new(1))
    }

    fn step_until<S: FlagStore>(
        ctl: &mut PhaseController<S, SeededSource>,
        from: DateTime<Utc>,
        millis: i64,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let mut t = 0;
        while t <= millis {
            events.extend(ctl.advance(from + Duration::milliseconds(t)));
            t += 10;
        }
        events
    }

    fn phases(events: &[Event]) -> Vec<Phase> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::PhaseEntered { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fresh_start_is_loading() {
        let t0 = target() - Duration::days(2);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        let events = ctl.start(t0);
        assert_eq!(phases(&events), [Phase::Loading]);
        assert_eq!(ctl.countdown().days, 2);
        assert!(ctl.start(t0).is_empty());
    }

    #[test]
    fn persisted_flag_starts_accepted() {
        let store = MemoryStore::with("portal14Accepted", "true");
        let mut ctl = controller(store, Environment::default());
        let events = ctl.start(target() - Duration::hours(1));
        assert_eq!(phases(&events), [Phase::Accepted]);
    }

    #[test]
    fn unreadable_store_starts_loading() {
        let mut ctl = controller(UnavailableStore, Environment::default());
        ctl.start(target());
        assert_eq!(ctl.phase(), Phase::Loading);
    }

    #[test]
    fn timed_sequence_reaches_question() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        let events = step_until(&mut ctl, t0, 6200 + 5200 + 5200);
        assert_eq!(phases(&events), [Phase::Scan, Phase::Sync, Phase::Question]);
        assert_eq!(ctl.phase(), Phase::Question);
        assert_eq!(ctl.pending_timers(), 0);
    }

    #[test]
    fn decoys_lock_to_target_text() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        let events = step_until(&mut ctl, t0, 3200);
        assert!(events.iter().any(|e| matches!(e, Event::DecoyLocked { .. })));
        let snap = ctl.snapshot();
        assert!(snap.decoy_locked && snap.date_resolved);
        assert_eq!(snap.decoy_date, "14/02/2026");
        assert_eq!(snap.decoy_clock, LOCKED_TIME);
        assert_eq!(snap.shaking, [ShakeTarget::Date]);

        let later = step_until(&mut ctl, t0 + Duration::milliseconds(3210), 1000);
        assert!(later.iter().all(|e| !matches!(e, Event::DecoyClock { .. } | Event::DecoyDate { .. })));
        assert!(ctl.snapshot().date_finalized);
        assert!(ctl.snapshot().shaking.is_empty());
    }

    #[test]
    fn scan_resolves_before_sync() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        let events = step_until(&mut ctl, t0, 6200 + 70 * 12);
        assert!(events.iter().any(|e| matches!(e, Event::ScanResolved { .. })));
        assert_eq!(ctl.snapshot().scan_display, "NICOLE REYES");
        assert_eq!(ctl.pending_in(Scope::Phase(Phase::Scan)), 2);
    }

    #[test]
    fn reduced_motion_skips_to_question_immediately() {
        let t0 = target() - Duration::days(1);
        let env = Environment {
            reduced_motion: true,
            coarse_pointer: false,
        };
        let mut ctl = controller(MemoryStore::new(), env);
        let mut events = ctl.start(t0);
        events.extend(ctl.advance(t0));
        assert_eq!(
            phases(&events),
            [Phase::Loading, Phase::Scan, Phase::Sync, Phase::Question]
        );
    }

    #[test]
    fn phase_timers_do_not_leak() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        let events = step_until(&mut ctl, t0, 20_000);
        let question_at = events
            .iter()
            .find_map(|e| match e {
                Event::PhaseEntered { phase: Phase::Question, at, .. } => Some(*at),
                _ => None,
            })
            .unwrap();
        assert!(events.iter().filter(|e| e.at() > question_at).count() == 0);
    }

    #[test]
    fn accept_persists_and_is_idempotent() {
        let t0 = target() - Duration::hours(1);
        let env = Environment {
            reduced_motion: true,
            coarse_pointer: false,
        };
        let mut ctl = controller(MemoryStore::new(), env);
        ctl.start(t0);
        ctl.advance(t0);
        let events = ctl.accept(t0);
        assert!(events.contains(&Event::AcceptRecorded { persisted: true, at: t0 }));
        assert_eq!(ctl.phase(), Phase::Accepted);
        let again = ctl.accept(t0);
        assert_eq!(again, [Event::AcceptRecorded { persisted: true, at: t0 }]);
        assert_eq!(ctl.phase(), Phase::Accepted);
        assert_eq!(ctl.store().get("portal14Accepted").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn accept_without_storage_still_enters_accepted() {
        let t0 = target() - Duration::hours(1);
        let env = Environment {
            reduced_motion: true,
            coarse_pointer: false,
        };
        let mut ctl = controller(UnavailableStore, env);
        ctl.start(t0);
        ctl.advance(t0);
        let events = ctl.accept(t0);
        assert!(events.contains(&Event::AcceptRecorded { persisted: false, at: t0 }));
        assert_eq!(ctl.phase(), Phase::Accepted);
    }

    #[test]
    fn accept_ignored_before_question() {
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(target());
        assert!(ctl.accept(target()).is_empty());
        assert_eq!(ctl.phase(), Phase::Loading);
    }

    #[test]
    fn letter_unlocks_at_target_and_types() {
        let t0 = target() - Duration::seconds(2);
        let store = MemoryStore::with("portal14Accepted", "true");
        let mut ctl = controller(store, Environment::default());
        ctl.start(t0);
        assert!(ctl.toggle_letter(t0).is_empty());

        let events = step_until(&mut ctl, t0, 2100);
        assert!(events.iter().any(|e| matches!(e, Event::LetterUnlocked { .. })));

        let open_at = target() + Duration::milliseconds(200);
        assert_eq!(ctl.toggle_letter(open_at), [Event::LetterOpened { at: open_at }]);
        let total = ctl.letter().len() as i64;
        let mut last = 0;
        let mut i = 0;
        while !ctl.letter().is_complete() {
            i += 1;
            assert!(i <= total + 5, "typing stalled at {last}");
            ctl.advance(open_at + Duration::milliseconds(34 * i));
            assert_eq!(ctl.letter().typed_length(), last + 1);
            last = ctl.letter().typed_length();
        }
        assert_eq!(i, total);
        assert_eq!(ctl.letter().typed_length(), ctl.letter().len());
        assert_eq!(ctl.pending_in(Scope::Letter), 0);

        let close_at = open_at + Duration::milliseconds(34 * (total + 20));
        assert_eq!(ctl.toggle_letter(close_at), [Event::LetterClosed { at: close_at }]);
        assert_eq!(ctl.letter().typed_length(), 0);
    }

    #[test]
    fn closing_letter_stops_typing() {
        let store = MemoryStore::with("portal14Accepted", "true");
        let mut ctl = controller(store, Environment::default());
        let t0 = target() + Duration::days(1);
        ctl.start(t0);
        assert!(ctl.is_letter_unlocked());
        ctl.toggle_letter(t0);
        ctl.advance(t0 + Duration::milliseconds(340));
        ctl.toggle_letter(t0 + Duration::milliseconds(340));
        let events = ctl.advance(t0 + Duration::milliseconds(3400));
        assert!(events.iter().all(|e| !matches!(e, Event::LetterTyped { .. })));
        assert_eq!(ctl.letter().typed_length(), 0);
    }

    #[test]
    fn evasion_only_on_fine_pointer() {
        let t0 = target() - Duration::days(1);
        let env = Environment {
            reduced_motion: true,
            coarse_pointer: false,
        };
        let mut ctl = controller(MemoryStore::new(), env);
        ctl.start(t0);
        ctl.advance(t0);
        let center = ctl.evasive().center();
        let moved = ctl.pointer_move(Point::new(center.x - 10.0, center.y), t0);
        assert!(matches!(moved.as_slice(), [Event::NoEvaded { .. }]));
        assert!(ctl.press_no(t0).is_empty());

        ctl.set_coarse_pointer(true, t0);
        let before = ctl.evasive().position();
        let c = ctl.evasive().center();
        assert!(ctl.pointer_move(c, t0).is_empty());
        assert_eq!(ctl.evasive().position(), before);

        let jiggle = ctl.press_no(t0);
        assert_eq!(
            jiggle,
            [Event::ShakeStarted {
                target: ShakeTarget::NoButton,
                at: t0
            }]
        );
        ctl.advance(t0);
        assert_eq!(ctl.phase(), Phase::Question);
        assert!(ctl.snapshot().shaking.is_empty());
    }

    #[test]
    fn reduced_motion_change_rearms_current_phase() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        step_until(&mut ctl, t0, 1000);
        let at = t0 + Duration::milliseconds(1000);
        let events = ctl.set_reduced_motion(true, at);
        assert_eq!(events, [Event::ReducedMotionChanged { reduced_motion: true, at }]);
        let after = ctl.advance(at);
        assert_eq!(
            phases(&after),
            [Phase::Scan, Phase::Sync, Phase::Question]
        );
    }

    #[test]
    fn motion_change_keeps_evaded_position() {
        let t0 = target() - Duration::days(1);
        let env = Environment {
            reduced_motion: true,
            coarse_pointer: false,
        };
        let mut ctl = controller(MemoryStore::new(), env);
        ctl.start(t0);
        ctl.advance(t0);
        assert_eq!(ctl.phase(), Phase::Question);

        let center = ctl.evasive().center();
        ctl.pointer_move(Point::new(center.x - 10.0, center.y), t0);
        let evaded = ctl.evasive().position();
        assert_ne!(evaded, evasive().position());

        ctl.set_reduced_motion(false, t0);
        ctl.advance(t0 + Duration::seconds(1));
        assert_eq!(ctl.phase(), Phase::Question);
        assert_eq!(ctl.evasive().position(), evaded);
    }

    #[test]
    fn motion_change_reopens_letter_from_start() {
        let store = MemoryStore::with("portal14Accepted", "true");
        let mut ctl = controller(store, Environment::default());
        let t0 = target() + Duration::days(1);
        ctl.start(t0);
        ctl.toggle_letter(t0);
        for i in 1..=10 {
            ctl.advance(t0 + Duration::milliseconds(34 * i));
        }
        assert_eq!(ctl.letter().typed_length(), 10);

        let at = t0 + Duration::milliseconds(340);
        let events = ctl.set_reduced_motion(true, at);
        assert_eq!(
            events,
            [
                Event::ReducedMotionChanged { reduced_motion: true, at },
                Event::LetterOpened { at },
            ]
        );
        assert!(ctl.letter().is_open());
        assert_eq!(ctl.letter().typed_length(), 0);
        assert_eq!(ctl.pending_in(Scope::Letter), 1);

        ctl.advance(at + Duration::milliseconds(10));
        assert_eq!(ctl.letter().typed_length(), 1);
    }

    #[test]
    fn teardown_cancels_everything() {
        let t0 = target() - Duration::days(1);
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(t0);
        assert!(ctl.pending_timers() > 0);
        ctl.teardown();
        assert_eq!(ctl.pending_timers(), 0);
        assert!(ctl.advance(t0 + Duration::days(1)).is_empty());
    }

    #[test]
    fn location_masked_until_accepted() {
        let mut ctl = controller(MemoryStore::new(), Environment::default());
        ctl.start(target());
        let snap = ctl.snapshot();
        assert!(!snap.location_revealed);
        assert!(!snap.location.contains("19.4326"));
        assert_eq!(snap.location.len(), experience().location_text.len());
    }
}
