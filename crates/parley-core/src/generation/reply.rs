//! Character reply generation.

use std::sync::Arc;

use parley_types::llm::{CompletionRequest, LlmError};
use tracing::{Instrument, debug, info_span};

use super::GenerationSettings;
use super::prompt::CharacterPromptBuilder;
use crate::llm::box_provider::BoxLlmProvider;
use crate::session::context::SessionContext;

/// Generates the character's next line from the session context.
pub struct ReplyGenerator {
    provider: Arc<BoxLlmProvider>,
    settings: GenerationSettings,
}

impl ReplyGenerator {
    pub fn new(provider: Arc<BoxLlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &Arc<BoxLlmProvider> {
        &self.provider
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Build the completion request for the next reply.
    ///
    /// Generation stops before the model starts writing the user's lines.
    pub fn build_request(&self, ctx: &SessionContext) -> CompletionRequest {
        CompletionRequest {
            model: self.settings.model.clone(),
            messages: CharacterPromptBuilder::history(&ctx.conversation),
            system: Some(CharacterPromptBuilder::build(ctx)),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            stop_sequences: Some(vec![format!("\n{}:", ctx.user_name())]),
        }
    }

    pub async fn generate_reply(&self, ctx: &SessionContext) -> Result<String, LlmError> {
        let request = self.build_request(ctx);
        let span = info_span!(
            "gen_ai.reply",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            session.id = %ctx.session_id,
        );
        let response = self.provider.complete(&request).instrument(span).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "reply generated"
        );

        let reply = clean_reply(&response.content, ctx.character_name());
        if reply.is_empty() {
            return Err(LlmError::Provider {
                message: "model returned an empty reply".to_string(),
            });
        }
        Ok(reply)
    }
}

/// Trim whitespace and a leading `"{character}:"` speaker label.
pub fn clean_reply(text: &str, character: &str) -> String {
    let text = text.trim();
    let text = text
        .strip_prefix(character)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(text);
    text.trim().to_string()
}
