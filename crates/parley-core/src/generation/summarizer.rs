//! Conversation summarization.
//!
//! When unsummarized utterances approach the conversation budget, older
//! utterances are condensed into a [`ConversationSummary`]. The utterances
//! keep their text; they are only marked as folded, so the log stays intact
//! while the prompt shrinks.

use std::sync::Arc;

use chrono::Utc;
use parley_types::conversation::{Conversation, ConversationSummary, Utterance, estimate_tokens};
use parley_types::llm::{CompletionRequest, LlmError, Message};
use uuid::Uuid;

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::token_budget::TokenBudget;

const SUMMARY_SYSTEM_PROMPT: &str = r#"Summarize the following role-play conversation segment concisely. Preserve:
1. Facts the speakers revealed about themselves
2. Promises, plans and unresolved questions
3. The emotional tone between the speakers

Keep the summary under 200 words. Write in third person using the speakers' names."#;

/// A new summary and the utterances it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldedSummary {
    pub summary: ConversationSummary,
    pub folded: Vec<Uuid>,
}

pub struct ConversationSummarizer {
    provider: Arc<BoxLlmProvider>,
    model: String,
    budget: TokenBudget,
    keep_recent: usize,
}

impl ConversationSummarizer {
    pub fn new(
        provider: Arc<BoxLlmProvider>,
        model: impl Into<String>,
        budget: TokenBudget,
        keep_recent: usize,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            budget,
            keep_recent,
        }
    }

    pub fn should_summarize(&self, conversation: &Conversation) -> bool {
        self.budget
            .should_summarize(conversation.unsummarized_tokens())
    }

    /// Summarize everything but the most recent utterances.
    ///
    /// Returns `None` when the budget is not exceeded or there is nothing
    /// old enough to fold.
    #[tracing::instrument(
        name = "summarize_conversation",
        skip(self, conversation),
        fields(conversation_id = %conversation.id, model = %self.model)
    )]
    pub async fn summarize(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<FoldedSummary>, LlmError> {
        if !self.should_summarize(conversation) {
            return Ok(None);
        }

        let unsummarized: Vec<&Utterance> = conversation.unsummarized().collect();
        let (to_fold, _) = select_utterances_to_fold(&unsummarized, self.keep_recent);
        if to_fold.is_empty() {
            return Ok(None);
        }

        let transcript: String = to_fold
            .iter()
            .map(|u| format!("{}: {}", u.sender, u.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(format!(
                "Please summarize this conversation:\n\n<conversation>\n{transcript}\n</conversation>"
            ))],
            system: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
            max_tokens: 512,
            temperature: Some(0.0),
            stop_sequences: None,
        };

        let response = self.provider.complete(&request).await?;
        let text = response.content.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(FoldedSummary {
            summary: ConversationSummary {
                id: Uuid::now_v7(),
                conversation_id: conversation.id,
                tokens: estimate_tokens(&text),
                text,
                utterance_count: to_fold.len() as u32,
                created_at: Utc::now(),
            },
            folded: to_fold.iter().map(|u| u.id).collect(),
        }))
    }
}

/// Split utterances into those to fold and the most recent `keep_recent`.
pub fn select_utterances_to_fold<'a, 'u>(
    utterances: &'a [&'u Utterance],
    keep_recent: usize,
) -> (&'a [&'u Utterance], &'a [&'u Utterance]) {
    if utterances.len() <= keep_recent {
        (&[], utterances)
    } else {
        utterances.split_at(utterances.len() - keep_recent)
    }
}
