//! Session activity types.
//!
//! Describes what a session is doing right now: idle, generating a reply,
//! or speaking a reply the client is playing back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Coarse phase of a session, as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityPhase {
    Idle,
    Generating,
    Speaking,
}

impl fmt::Display for ActivityPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityPhase::Idle => write!(f, "idle"),
            ActivityPhase::Generating => write!(f, "generating"),
            ActivityPhase::Speaking => write!(f, "speaking"),
        }
    }
}

/// The line the character is speaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenLine {
    pub text: String,
    /// Nominal playback duration (estimated until the client reports it).
    pub duration: Duration,
}

/// Current activity with its phase-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Generating,
    Speaking(SpokenLine),
}

impl Activity {
    pub fn phase(&self) -> ActivityPhase {
        match self {
            Activity::Idle => ActivityPhase::Idle,
            Activity::Generating => ActivityPhase::Generating,
            Activity::Speaking(_) => ActivityPhase::Speaking,
        }
    }
}

/// Snapshot of the session's activity and when it began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityState {
    pub activity: Activity,
    pub entered_at: Instant,
}

impl ActivityState {
    pub fn phase(&self) -> ActivityPhase {
        self.activity.phase()
    }
}
