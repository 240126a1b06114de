//! Action inference: which of the client's action labels the character
//! performs after a reply.

use std::sync::Arc;

use parley_types::conversation::MessageRole;
use parley_types::llm::{CompletionRequest, LlmError, Message};
use tracing::{Instrument, info_span};

use crate::llm::box_provider::BoxLlmProvider;
use crate::session::context::SessionContext;

const ACTION_SYSTEM_PROMPT: &str = "You choose what a role-play character physically does next. \
Answer with exactly one action name from the list and nothing else.";

/// Utterances shown to the model when choosing an action.
const TRANSCRIPT_WINDOW: usize = 6;

pub struct ActionSelector {
    provider: Arc<BoxLlmProvider>,
    model: String,
}

impl ActionSelector {
    pub fn new(provider: Arc<BoxLlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Pick one of `ctx.actions`, or `None` if there are none or the model
    /// named something else.
    pub async fn select_action(&self, ctx: &SessionContext) -> Result<Option<String>, LlmError> {
        if ctx.actions.is_empty() {
            return Ok(None);
        }

        let request = self.build_request(ctx);
        let span = info_span!(
            "gen_ai.action",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            action_count = ctx.actions.len(),
        );
        let response = self.provider.complete(&request).instrument(span).await?;
        let action = parse_action(&response.content, &ctx.actions);
        if action.is_none() {
            tracing::debug!(response = %response.content.trim(), "model chose no known action");
        }
        Ok(action)
    }

    fn build_request(&self, ctx: &SessionContext) -> CompletionRequest {
        let utterances = ctx.conversation.utterances();
        let start = utterances.len().saturating_sub(TRANSCRIPT_WINDOW);
        let transcript: Vec<String> = utterances[start..]
            .iter()
            .map(|u| {
                let speaker = match u.role {
                    MessageRole::Assistant => ctx.character_name(),
                    _ => ctx.user_name(),
                };
                format!("{speaker}: {}", u.text)
            })
            .collect();
        let actions: Vec<String> = ctx.actions.iter().map(|a| format!("- {a}")).collect();

        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(format!(
                "<conversation>\n{}\n</conversation>\n\nAvailable actions:\n{}\n\nWhich action does {} take now?",
                transcript.join("\n"),
                actions.join("\n"),
                ctx.character_name(),
            ))],
            system: Some(ACTION_SYSTEM_PROMPT.to_string()),
            max_tokens: 16,
            temperature: Some(0.0),
            stop_sequences: None,
        }
    }
}

/// Match a model answer against the available action labels.
///
/// Accepts the label with surrounding quotes, markup or punctuation, and
/// falls back to the first label mentioned anywhere in the answer.
pub fn parse_action(response: &str, actions: &[String]) -> Option<String> {
    let cleaned = response
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | '-' | ' '))
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    actions
        .iter()
        .find(|a| a.to_lowercase() == cleaned)
        .or_else(|| actions.iter().find(|a| cleaned.contains(&a.to_lowercase())))
        .cloned()
}
