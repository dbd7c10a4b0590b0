use portal14_core::{Config, Countdown, Experience, PhaseController, ThreadSource};

use super::{environment, open_store, parse_now};

/// Start a controller at `now` and print its first frame.
pub fn status(now: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let now = parse_now(now.as_deref())?;
    let config = Config::load_or_default();
    let env = environment(&config.accessibility, false, false);
    let mut ctl = PhaseController::from_config(&config, env, open_store(), ThreadSource)?;
    ctl.start(now);
    let snapshot = ctl.snapshot();
    ctl.teardown();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn countdown(now: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let now = parse_now(now.as_deref())?;
    let config = Config::load_or_default();
    let experience = Experience::from_config(&config.experience)?;
    let countdown = Countdown::until(now, experience.target);
    let json = serde_json::json!({
        "countdown": countdown,
        "display": countdown.display(),
        "unlocked": countdown.is_complete(),
        "target": experience.target,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
