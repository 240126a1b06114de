//! Background sweep of speech entries that were never fetched.

use std::time::Duration;

use parley_core::speech::registry::PendingSpeechRegistry;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One-shot entries older than this are dropped.
pub const SPEECH_MAX_AGE: Duration = Duration::from_secs(10 * 60);

/// Periodically purge stale one-shot entries until `shutdown` fires.
pub fn spawn_speech_sweeper(
    registry: PendingSpeechRegistry,
    interval: Duration,
    max_age: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let max_age = chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::days(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = registry.purge_stale(chrono::Utc::now() - max_age);
                    if removed > 0 {
                        tracing::debug!(removed, remaining = registry.len(), "purged stale speech entries");
                    }
                }
            }
        }
    })
}
