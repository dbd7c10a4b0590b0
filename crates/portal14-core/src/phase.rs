use serde::{Deserialize, Serialize};

/// Presentation phase. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Loading,
    Scan,
    Sync,
    Question,
    Accepted,
}

impl Phase {
    /// Phase reached when this one's timer expires. `Question` waits for
    /// the user and `Accepted` is terminal.
    pub fn timed_successor(self) -> Option<Phase> {
        match self {
            Phase::Loading => Some(Phase::Scan),
            Phase::Scan => Some(Phase::Sync),
            Phase::Sync => Some(Phase::Question),
            Phase::Question | Phase::Accepted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Accepted
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::Scan => "scan",
            Phase::Sync => "sync",
            Phase::Question => "question",
            Phase::Accepted => "accepted",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
