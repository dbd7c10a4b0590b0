//! Plain-text rendering of controller events for the terminal.

use std::io::Write;

use portal14_core::countdown::pad;
use portal14_core::{Event, Phase, ShakeTarget, Snapshot};

/// Turns events into terminal lines. Refresh ticks are throttled to one
/// line per second so the scrollback stays readable.
#[derive(Debug, Default)]
pub struct Renderer {
    last_countdown_second: Option<u64>,
    printed_letter: usize,
}

impl Renderer {
    pub fn render(&mut self, events: &[Event], snapshot: &Snapshot) {
        for event in events {
            if let Some(line) = self.line(event, snapshot) {
                println!("{line}");
            }
        }
        self.type_letter(snapshot);
    }

    fn line(&mut self, event: &Event, snapshot: &Snapshot) -> Option<String> {
        match event {
            Event::PhaseEntered { phase, .. } => {
                self.last_countdown_second = None;
                Some(phase_banner(*phase, snapshot))
            }
            Event::CountdownTick { countdown, .. } => {
                let second = countdown.diff / 1000;
                if snapshot.letter_open || self.last_countdown_second == Some(second) {
                    return None;
                }
                self.last_countdown_second = Some(second);
                Some(format!("  [{}]", countdown.display()))
            }
            Event::ElapsedTick { elapsed, .. } => {
                if !snapshot.letter_open {
                    return None;
                }
                Some(format!(
                    "  Tiempo invertido: {}d {}h {}m {}s",
                    pad(elapsed.days, 2),
                    pad(elapsed.hours, 2),
                    pad(elapsed.minutes, 2),
                    pad(elapsed.seconds, 2)
                ))
            }
            Event::DecoyClock { clock, .. } => Some(format!("  hora  {}", clock.display())),
            Event::DecoyDate { date, .. } => Some(format!("  fecha {date}")),
            Event::DecoyLocked { clock, date, .. } => Some(format!(
                "  >> Detectado: {date} {}",
                clock.display()
            )),
            Event::DateFinalized { .. } => Some("  Fecha confirmada".to_string()),
            Event::ShakeStarted { target, .. } => Some(
                match target {
                    ShakeTarget::Date => "  *sacudida*",
                    ShakeTarget::Scan => "  *identidad confirmada*",
                    ShakeTarget::NoButton => "  [No] *tiembla* ... pero no se rinde",
                }
                .to_string(),
            ),
            Event::ShakeEnded { .. } => None,
            Event::ScanTick { display, .. } => Some(format!("  escaneando: {display}")),
            Event::ScanResolved { name, .. } => Some(format!("  Identidad: {name}")),
            Event::NoEvaded { position, .. } => Some(format!(
                "  [No] se escapa a ({:.0}, {:.0})",
                position.x, position.y
            )),
            Event::AcceptRecorded { persisted, .. } => Some(if *persisted {
                "  Invitacion aceptada".to_string()
            } else {
                "  Invitacion aceptada (sin guardar)".to_string()
            }),
            Event::LetterUnlocked { .. } => {
                Some("  Carta disponible. Escribe 'carta' para abrirla.".to_string())
            }
            Event::LetterOpened { .. } => {
                self.printed_letter = 0;
                Some("  --- Carta ---".to_string())
            }
            Event::LetterClosed { .. } => {
                self.printed_letter = 0;
                Some("\n  --- Carta cerrada ---".to_string())
            }
            Event::LetterTyped { .. } => None,
            Event::ReducedMotionChanged { reduced_motion, .. } => Some(format!(
                "  movimiento reducido: {}",
                if *reduced_motion { "si" } else { "no" }
            )),
            Event::PointerChanged { coarse_pointer, .. } => Some(format!(
                "  puntero tactil: {}",
                if *coarse_pointer { "si" } else { "no" }
            )),
        }
    }

    /// Print the newly typed part of the letter without a newline.
    fn type_letter(&mut self, snapshot: &Snapshot) {
        if snapshot.typed_length < self.printed_letter {
            // Cursor went back: the letter restarted.
            println!();
            self.printed_letter = 0;
        }
        if !snapshot.letter_open || snapshot.typed_length <= self.printed_letter {
            return;
        }
        let fresh: String = snapshot
            .typed_text
            .chars()
            .skip(self.printed_letter)
            .collect();
        print!("{fresh}");
        let _ = std::io::stdout().flush();
        self.printed_letter = snapshot.typed_length;
        if snapshot.typed_length == snapshot.letter_total {
            println!();
        }
    }
}

fn phase_banner(phase: Phase, snapshot: &Snapshot) -> String {
    match phase {
        Phase::Loading => "== Desencriptando acceso ==".to_string(),
        Phase::Scan => "== Escaneo biometrico ==".to_string(),
        Phase::Sync => "== Sincronizando ==".to_string(),
        Phase::Question => format!(
            "== Location Decryptor: {} ==\n  Aceptar invitacion? (si / no)",
            snapshot.location
        ),
        Phase::Accepted => {
            let letter = if snapshot.letter_unlocked {
                "disponible".to_string()
            } else {
                format!("bloqueada hasta el {}", snapshot.unlock_date)
            };
            format!("== Acceso concedido ==\n  {}\n  Carta: {letter}", snapshot.location)
        }
    }
}
