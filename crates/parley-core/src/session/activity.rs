//! Tracks what a session is doing and for how long.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_types::activity::{Activity, ActivityPhase, ActivityState, SpokenLine};

use super::clock::Clock;

/// Current activity of a session, timed by an injectable [`Clock`].
pub struct ActivityTracker {
    clock: Arc<dyn Clock>,
    state: ActivityState,
}

impl ActivityTracker {
    /// A tracker starting in `Idle` at the clock's current time.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let entered_at = clock.now();
        Self {
            clock,
            state: ActivityState {
                activity: Activity::Idle,
                entered_at,
            },
        }
    }

    pub fn state(&self) -> &ActivityState {
        &self.state
    }

    pub fn phase(&self) -> ActivityPhase {
        self.state.phase()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Time since the current activity began.
    pub fn elapsed(&self) -> Duration {
        self.clock
            .now()
            .saturating_duration_since(self.state.entered_at)
    }

    pub fn enter_idle(&mut self) {
        self.enter(Activity::Idle, self.clock.now());
    }

    pub fn enter_generating(&mut self) {
        self.enter(Activity::Generating, self.clock.now());
    }

    /// Start speaking `text` now.
    pub fn enter_speaking(&mut self, text: impl Into<String>, duration: Duration) {
        let now = self.clock.now();
        self.enter_speaking_at(text, duration, now);
    }

    /// Start speaking `text` as of `started_at`, e.g. when the client
    /// reported playback before the session got to process it.
    pub fn enter_speaking_at(
        &mut self,
        text: impl Into<String>,
        duration: Duration,
        started_at: Instant,
    ) {
        self.enter(
            Activity::Speaking(SpokenLine {
                text: text.into(),
                duration,
            }),
            started_at,
        );
    }

    fn enter(&mut self, activity: Activity, entered_at: Instant) {
        tracing::trace!(from = %self.state.phase(), to = %activity.phase(), "activity transition");
        self.state = ActivityState {
            activity,
            entered_at,
        };
    }
}
