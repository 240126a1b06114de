//! Token budget management for LLM context windows.
//!
//! Allocates the context window across the character card, recalled
//! memories, scene context and the conversation itself.

use parley_types::llm::ProviderCapabilities;

/// Allocation of an LLM's context window.
///
/// - Character card (system prompt): 15%
/// - Recalled memories: 10%
/// - Scene context: 5%
/// - Conversation (unsummarized utterances): 70%
#[derive(Debug, Clone)]
pub struct TokenBudget {
    pub max_context_tokens: u32,
    pub character_budget: u32,
    pub memory_budget: u32,
    pub scene_budget: u32,
    pub conversation_budget: u32,
}

impl TokenBudget {
    pub fn new(max_context: u32) -> Self {
        Self {
            max_context_tokens: max_context,
            character_budget: max_context * 15 / 100,
            memory_budget: max_context * 10 / 100,
            scene_budget: max_context * 5 / 100,
            conversation_budget: max_context * 70 / 100,
        }
    }

    /// Conversation tokens still available given current usage.
    pub fn conversation_remaining(&self, used: u32) -> u32 {
        self.conversation_budget.saturating_sub(used)
    }

    /// Whether older utterances should be folded into a summary.
    ///
    /// True once conversation tokens exceed 80% of the conversation budget.
    pub fn should_summarize(&self, conversation_tokens: u32) -> bool {
        conversation_tokens > self.conversation_budget * 80 / 100
    }

    pub fn from_capabilities(caps: &ProviderCapabilities) -> Self {
        Self::new(caps.max_context_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allocation() {
        let budget = TokenBudget::new(100_000);
        assert_eq!(budget.character_budget, 15_000);
        assert_eq!(budget.memory_budget, 10_000);
        assert_eq!(budget.scene_budget, 5_000);
        assert_eq!(budget.conversation_budget, 70_000);
    }

    #[test]
    fn test_conversation_remaining_saturates() {
        let budget = TokenBudget::new(10_000);
        assert_eq!(budget.conversation_remaining(4_000), 3_000);
        assert_eq!(budget.conversation_remaining(9_000), 0);
    }

    #[test]
    fn test_should_summarize_threshold() {
        // 80% of 7_000 = 5_600
        let budget = TokenBudget::new(10_000);
        assert!(!budget.should_summarize(5_600));
        assert!(budget.should_summarize(5_601));
    }

    #[test]
    fn test_from_capabilities() {
        let caps = ProviderCapabilities {
            max_context_tokens: 8_192,
            max_output_tokens: 1_024,
        };
        let budget = TokenBudget::from_capabilities(&caps);
        assert_eq!(budget.max_context_tokens, 8_192);
        assert_eq!(budget.conversation_budget, 5_734);
    }
}
