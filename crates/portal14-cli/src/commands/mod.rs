pub mod config;
pub mod flag;
pub mod render;
pub mod run;
pub mod simulate;
pub mod status;

use chrono::{DateTime, Utc};
use portal14_core::storage::{AccessibilityConfig, Database, FlagStore, UnavailableStore};
use portal14_core::Environment;

/// Parse an RFC 3339 instant, defaulting to the system clock.
pub fn parse_now(now: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match now {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("invalid --now '{s}': {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

/// Whether an environment variable is set to something truthy.
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Resolve device signals: command-line flags win, then the config file,
/// then PORTAL14_REDUCED_MOTION / PORTAL14_COARSE_POINTER.
pub fn environment(cfg: &AccessibilityConfig, reduced_motion: bool, touch: bool) -> Environment {
    Environment {
        reduced_motion: reduced_motion
            || cfg
                .reduced_motion
                .unwrap_or_else(|| env_flag("PORTAL14_REDUCED_MOTION")),
        coarse_pointer: touch
            || cfg
                .coarse_pointer
                .unwrap_or_else(|| env_flag("PORTAL14_COARSE_POINTER")),
    }
}

/// The persistent flag store, or a store that refuses everything when the
/// database cannot be opened. Storage is never fatal for the experience.
pub fn open_store() -> Box<dyn FlagStore> {
    match Database::open() {
        Ok(db) => Box::new(db),
        Err(e) => {
            tracing::warn!(error = %e, "flag store unavailable, acceptance will not persist");
            Box::new(UnavailableStore)
        }
    }
}
