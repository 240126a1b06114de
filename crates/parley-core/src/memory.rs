//! Memory recall for character cards.
//!
//! A character card may carry memory entries, each tagged with keywords.
//! Before every reply the session asks a [`MemoryRecall`] for the entries
//! that the most recent utterances mention.

use parley_types::character::MemoryEntry;
use parley_types::conversation::Conversation;

/// Utterances (newest first) scanned for keywords.
const DEFAULT_LOOKBACK: usize = 4;

/// Source of memories relevant to the current conversation.
///
/// `query_fast` runs while the session state is locked, so implementations
/// must answer from memory without I/O.
pub trait MemoryRecall: Send + Sync {
    fn query_fast(&self, conversation: &Conversation) -> Vec<String>;
}

/// Keyword-matched memories from a character card.
#[derive(Debug, Clone, Default)]
pub struct KeywordMemoryBook {
    entries: Vec<MemoryEntry>,
    lookback: usize,
}

impl KeywordMemoryBook {
    pub fn new(entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries,
            lookback: DEFAULT_LOOKBACK,
        }
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MemoryRecall for KeywordMemoryBook {
    fn query_fast(&self, conversation: &Conversation) -> Vec<String> {
        if self.entries.is_empty() {
            return Vec::new();
        }

        let haystack: String = conversation
            .utterances()
            .iter()
            .rev()
            .take(self.lookback)
            .map(|u| u.text.to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .any(|k| !k.is_empty() && haystack.contains(&k))
            })
            .map(|entry| entry.text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::conversation::{MessageRole, Utterance};

    fn book() -> KeywordMemoryBook {
        KeywordMemoryBook::new(vec![
            MemoryEntry {
                keywords: vec!["cat".to_string(), "Mittens".to_string()],
                text: "Kate has a cat named Mittens.".to_string(),
            },
            MemoryEntry {
                keywords: vec!["paris".to_string()],
                text: "Kate grew up in Paris.".to_string(),
            },
        ])
    }

    fn conversation(lines: &[&str]) -> Conversation {
        let mut conversation = Conversation::new("kate");
        let id = conversation.id;
        for line in lines {
            conversation.append(Utterance::new(id, MessageRole::User, "Joe", *line));
        }
        conversation
    }

    #[test]
    fn test_matches_keywords_case_insensitively() {
        let found = book().query_fast(&conversation(&["How is MITTENS doing?"]));
        assert_eq!(found, vec!["Kate has a cat named Mittens.".to_string()]);
    }

    #[test]
    fn test_ignores_utterances_outside_lookback() {
        let found = book()
            .with_lookback(1)
            .query_fast(&conversation(&["Tell me about Paris", "Nice weather"]));
        assert!(found.is_empty());
    }

    #[test]
    fn test_returns_entries_in_card_order() {
        let found = book().query_fast(&conversation(&["paris", "your cat"]));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], "Kate has a cat named Mittens.");
    }

    #[test]
    fn test_empty_book_returns_nothing() {
        let found = KeywordMemoryBook::default().query_fast(&conversation(&["cat"]));
        assert!(found.is_empty());
    }
}
