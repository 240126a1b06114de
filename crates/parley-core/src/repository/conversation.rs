//! Conversation repository trait definition.

use parley_types::conversation::{Conversation, ConversationSummary, Utterance};
use parley_types::error::RepositoryError;
use uuid::Uuid;

/// Storage for conversations, their utterances and summaries.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConversationRepository: Send + Sync {
    /// Persist a new, empty conversation.
    fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load a conversation with its utterances (oldest first) and summaries.
    fn get_conversation(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    fn append_utterance(
        &self,
        utterance: &Utterance,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Overwrite the text (and token estimate) of an existing utterance.
    fn update_utterance(
        &self,
        utterance: &Utterance,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn list_utterances(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Utterance>, RepositoryError>> + Send;

    /// Store a summary and mark `folded` utterances as summarized by it.
    fn save_summary(
        &self,
        summary: &ConversationSummary,
        folded: &[Uuid],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
