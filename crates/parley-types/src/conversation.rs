//! Conversation log types for Parley.
//!
//! A [`Conversation`] is the append-mostly record of [`Utterance`]s exchanged
//! between the user and a character. Only the most recent utterance may have
//! its text rewritten, and only through [`Conversation::rewrite_last`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::llm::MessageRole;

/// Rough token estimate for a piece of text (1 token ~ 4 chars, rounded up).
pub fn estimate_tokens(text: &str) -> u32 {
    text.chars().count().div_ceil(4) as u32
}

/// A single turn in the conversation log, attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    /// Display name of the speaker (user name or character name).
    pub sender: String,
    pub text: String,
    /// Estimated token cost of `text`.
    pub tokens: u32,
    pub created_at: DateTime<Utc>,
    /// Summary this utterance was folded into, if any.
    pub summarized_by: Option<Uuid>,
}

impl Utterance {
    /// Create a new utterance stamped with the current time.
    pub fn new(
        conversation_id: Uuid,
        role: MessageRole,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            sender: sender.into(),
            tokens: estimate_tokens(&text),
            text,
            created_at: Utc::now(),
            summarized_by: None,
        }
    }

    pub fn is_summarized(&self) -> bool {
        self.summarized_by.is_some()
    }
}

/// A condensed summary of older utterances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub text: String,
    pub tokens: u32,
    /// Number of utterances folded into this summary.
    pub utterance_count: u32,
    pub created_at: DateTime<Utc>,
}

/// A conversation between the user and one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub character_id: String,
    pub created_at: DateTime<Utc>,
    utterances: Vec<Utterance>,
    summaries: Vec<ConversationSummary>,
}

impl Conversation {
    /// Start an empty conversation with a character.
    pub fn new(character_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            character_id: character_id.into(),
            created_at: Utc::now(),
            utterances: Vec::new(),
            summaries: Vec::new(),
        }
    }

    /// Rebuild a conversation from persisted parts.
    pub fn restore(
        id: Uuid,
        character_id: String,
        created_at: DateTime<Utc>,
        utterances: Vec<Utterance>,
        summaries: Vec<ConversationSummary>,
    ) -> Self {
        Self {
            id,
            character_id,
            created_at,
            utterances,
            summaries,
        }
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.utterances.last()
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Append an utterance to the end of the log.
    pub fn append(&mut self, utterance: Utterance) -> &Utterance {
        self.utterances.push(utterance);
        &self.utterances[self.utterances.len() - 1]
    }

    /// Replace the text of the most recent utterance.
    ///
    /// Returns the rewritten utterance, or `None` when the log is empty.
    pub fn rewrite_last(&mut self, text: impl Into<String>) -> Option<&Utterance> {
        let last = self.utterances.last_mut()?;
        last.text = text.into();
        last.tokens = estimate_tokens(&last.text);
        Some(last)
    }

    /// Utterances that have not been folded into a summary yet.
    pub fn unsummarized(&self) -> impl Iterator<Item = &Utterance> {
        self.utterances.iter().filter(|u| !u.is_summarized())
    }

    /// Token estimate of all unsummarized utterances.
    pub fn unsummarized_tokens(&self) -> u32 {
        self.unsummarized().map(|u| u.tokens).sum()
    }

    /// Record a summary and mark the given utterances as folded into it.
    ///
    /// Only the summarization marker changes; utterance text is untouched.
    pub fn fold_into_summary(&mut self, summary: ConversationSummary, folded: &[Uuid]) {
        for utterance in self
            .utterances
            .iter_mut()
            .filter(|u| folded.contains(&u.id))
        {
            utterance.summarized_by = Some(summary.id);
        }
        self.summaries.push(summary);
    }
}
