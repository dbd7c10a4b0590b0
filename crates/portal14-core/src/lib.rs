//! # portal14 Core Library
//!
//! Core logic of the portal14 invitation: a staged sequence of animated
//! phases (decryption, biometric scan, sync, question) ending in the reveal
//! of a location and a typed letter once the unlock date arrives. The
//! `portal14` CLI is a thin terminal front end over this library.
//!
//! ## Architecture
//!
//! - **Phase Controller**: a wall-clock-driven state machine. The caller
//!   feeds it the current instant; it never spawns threads or sleeps
//! - **Scheduler**: cooperative, scope-tagged timers that are cancelled with
//!   their owning phase
//! - **Storage**: a single persisted "accepted" flag in SQLite, plus TOML
//!   configuration
//!
//! ## Key Components
//!
//! - [`PhaseController`]: the state machine
//! - [`Countdown`]: time-until-unlock decomposition
//! - [`EvasiveButton`]: the unreachable No control
//! - [`Config`]: application configuration management

pub mod controller;
pub mod countdown;
pub mod decoy;
pub mod error;
pub mod events;
pub mod evasion;
pub mod letter;
pub mod motion;
pub mod phase;
pub mod scheduler;
pub mod scramble;
pub mod storage;

pub use controller::{Environment, Experience, PhaseController, Snapshot};
pub use countdown::{Countdown, Elapsed};
pub use decoy::{ClockFace, DecoySource, SeededSource, ThreadSource};
pub use error::{ConfigError, StorageError, ValidationError};
pub use events::{Event, ShakeTarget};
pub use evasion::{EvasionParams, EvasiveButton, Point, Size};
pub use letter::LetterTyper;
pub use motion::MotionProfile;
pub use phase::Phase;
pub use scheduler::{Scheduler, Scope};
pub use scramble::ScrambleReveal;
pub use storage::{AcceptedFlag, Config, Database, FlagStore, MemoryStore, UnavailableStore};
