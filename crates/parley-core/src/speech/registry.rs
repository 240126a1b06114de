//! Registry of speech entries awaiting retrieval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parley_types::speech::PendingSpeechEntry;

/// Server-wide map of pending speech, keyed by entry id.
///
/// Cloning is cheap; every session and the fetch endpoint share one map.
#[derive(Debug, Clone, Default)]
pub struct PendingSpeechRegistry {
    entries: Arc<DashMap<String, PendingSpeechEntry>>,
}

impl PendingSpeechRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry under its id.
    ///
    /// A reusable entry that is already registered is kept as-is, so callers
    /// can register the same content repeatedly. Anything else replaces the
    /// previous entry. Returns the id the entry is fetched by.
    pub fn register(&self, entry: PendingSpeechEntry) -> String {
        let id = entry.id.clone();
        match self.entries.entry(id.clone()) {
            Entry::Occupied(existing) if existing.get().reusable && entry.reusable => {}
            Entry::Occupied(mut existing) => {
                existing.insert(entry);
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
        id
    }

    pub fn try_get(&self, id: &str) -> Option<PendingSpeechEntry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    /// Take an entry for serving. One-shot entries are removed atomically, so
    /// at most one caller gets them; reusable entries are cloned.
    pub fn claim(&self, id: &str) -> Option<PendingSpeechEntry> {
        if let Some((_, entry)) = self.entries.remove_if(id, |_, e| !e.reusable) {
            return Some(entry);
        }
        self.try_get(id)
    }

    pub fn remove(&self, id: &str) -> Option<PendingSpeechEntry> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    /// Drop non-reusable entries created before `cutoff`. Returns how many
    /// were removed.
    pub fn purge_stale(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.reusable || entry.created_at >= cutoff);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
