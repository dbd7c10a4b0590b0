//! Real-time terminal playback.
//!
//! A current-thread tokio runtime polls the controller on a short interval
//! and reads commands from stdin. The controller itself never sleeps; this
//! loop is the only thing that waits.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::Args;
use portal14_core::{Config, Event, FlagStore, Phase, PhaseController, Point, ThreadSource};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::render::Renderer;
use super::{environment, open_store, parse_now};

const FRAME: Duration = Duration::from_millis(16);

#[derive(Args)]
pub struct RunArgs {
    /// Shorten every animation, as with a reduced-motion preference
    #[arg(long)]
    pub reduced_motion: bool,
    /// Behave like a touch device: the No control jiggles instead of fleeing
    #[arg(long)]
    pub touch: bool,
    /// Pretend the clock started at this instant (RFC 3339)
    #[arg(long)]
    pub now: Option<String>,
}

/// Wall clock, optionally shifted to start at a chosen instant.
struct ShiftedClock {
    base: DateTime<Utc>,
    started: Instant,
}

impl ShiftedClock {
    fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed()).unwrap_or_default();
        self.base + elapsed
    }
}

enum Command {
    Accept,
    No,
    Letter,
    ToggleMotion,
    ToggleTouch,
    Status,
    Quit,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    match line.trim().to_lowercase().as_str() {
        "si" | "sí" | "s" | "yes" | "y" | "acepto" => Command::Accept,
        "no" | "n" => Command::No,
        "carta" | "letter" | "l" => Command::Letter,
        "motion" | "movimiento" => Command::ToggleMotion,
        "touch" | "tactil" => Command::ToggleTouch,
        "status" | "estado" => Command::Status,
        "q" | "quit" | "salir" => Command::Quit,
        _ => Command::Unknown,
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let result = runtime.block_on(drive(args));
    // Stdin is read on a blocking thread that never returns on its own.
    runtime.shutdown_background();
    result
}

async fn drive(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let env = environment(&config.accessibility, args.reduced_motion, args.touch);
    let clock = ShiftedClock::new(parse_now(args.now.as_deref())?);
    let mut ctl = PhaseController::from_config(&config, env, open_store(), ThreadSource)?;
    let mut renderer = Renderer::default();

    let events = ctl.start(clock.now());
    renderer.render(&events, &ctl.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frames = tokio::time::interval(FRAME);
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let events = ctl.advance(clock.now());
                renderer.render(&events, &ctl.snapshot());
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                match parse_command(&line) {
                    Command::Quit => break,
                    command => {
                        let events = handle(&mut ctl, command, clock.now())?;
                        renderer.render(&events, &ctl.snapshot());
                    }
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    ctl.teardown();
    tracing::debug!("playback finished");
    Ok(())
}

fn handle<S: FlagStore>(
    ctl: &mut PhaseController<S, ThreadSource>,
    command: Command,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, Box<dyn std::error::Error>> {
    let events = match command {
        Command::Accept => ctl.accept(now),
        Command::No => {
            if ctl.environment().coarse_pointer {
                ctl.press_no(now)
            } else {
                // Reaching for the button means approaching it first.
                let center = ctl.evasive().center();
                ctl.pointer_move(Point::new(center.x - 12.0, center.y + 4.0), now)
            }
        }
        Command::Letter => {
            if ctl.phase() == Phase::Accepted && !ctl.is_letter_unlocked() {
                println!("  La carta sigue bloqueada: {}", ctl.countdown().display());
            }
            ctl.toggle_letter(now)
        }
        Command::ToggleMotion => {
            let reduced = !ctl.environment().reduced_motion;
            ctl.set_reduced_motion(reduced, now)
        }
        Command::ToggleTouch => {
            let coarse = !ctl.environment().coarse_pointer;
            ctl.set_coarse_pointer(coarse, now)
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&ctl.snapshot())?);
            Vec::new()
        }
        Command::Unknown => {
            println!("  comandos: si, no, carta, movimiento, tactil, estado, salir");
            Vec::new()
        }
        Command::Quit => Vec::new(),
    };
    Ok(events)
}
