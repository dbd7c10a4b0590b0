//! Character-scramble reveal for the biometric scan.

use serde::{Deserialize, Serialize};

use crate::decoy::DecoySource;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Reveals a name one leading character per tick, filling the rest with
/// random uppercase letters. Spaces are never scrambled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrambleReveal {
    target: Vec<char>,
    iterations: usize,
    display: String,
}

impl ScrambleReveal {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.chars().collect(),
            iterations: 0,
            display: target.to_string(),
        }
    }

    /// Advance one tick and return the new display string.
    ///
    /// Once resolved, further ticks leave the display unchanged.
    pub fn tick(&mut self, src: &mut dyn DecoySource) -> &str {
        if self.is_resolved() {
            return &self.display;
        }
        self.iterations += 1;
        let reveal = self.iterations.min(self.target.len());
        self.display = self
            .target
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if c == ' ' || i < reveal {
                    c
                } else {
                    ALPHABET[src.below(ALPHABET.len() as u32) as usize] as char
                }
            })
            .collect();
        &self.display
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// True after `len(target)` ticks.
    pub fn is_resolved(&self) -> bool {
        self.iterations >= self.target.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoy::SeededSource;
    use proptest::prelude::*;

    #[test]
    fn resolves_after_name_length_ticks() {
        let name = "NICOLE REYES";
        let mut src = SeededSource::new(3);
        let mut s = ScrambleReveal::new(name);
        for _ in 0..name.len() - 1 {
            s.tick(&mut src);
            assert!(!s.is_resolved());
        }
        assert_eq!(s.tick(&mut src), name);
        assert!(s.is_resolved());
        assert_eq!(s.tick(&mut src), name);
        assert_eq!(s.iterations(), name.len());
    }

    #[test]
    fn empty_name_is_resolved() {
        assert!(ScrambleReveal::new("").is_resolved());
    }

    proptest! {
        #[test]
        fn prefix_is_revealed(k in 1usize..=12, seed in any::<u64>()) {
            let name = "NICOLE REYES";
            let mut src = SeededSource::new(seed);
            let mut s = ScrambleReveal::new(name);
            for _ in 0..k {
                s.tick(&mut src);
            }
            let shown: Vec<char> = s.display().chars().collect();
            let target: Vec<char> = name.chars().collect();
            prop_assert_eq!(shown.len(), target.len());
            prop_assert_eq!(&shown[..k], &target[..k]);
            for (i, c) in target.iter().enumerate() {
                if *c == ' ' {
                    prop_assert_eq!(shown[i], ' ');
                } else {
                    prop_assert!(shown[i].is_ascii_uppercase());
                }
            }
        }
    }
}
