//! System prompt builder for characters.
//!
//! Assembles the system prompt from the character card, the user profile,
//! recalled memories, conversation summaries and the client's scene
//! context, using XML tag boundaries for section delineation.

use parley_types::conversation::{Conversation, MessageRole};
use parley_types::llm::Message;

use crate::session::context::SessionContext;

/// Builds the system prompt and message history for a reply.
///
/// Layout:
/// ```text
/// <character>{system_prompt} Name: ... {description}</character>
/// <personality>...</personality>
/// <scenario>...</scenario>
/// <user>Name: ... {description}</user>
/// <memories>- ...</memories>
/// <summary>Earlier in this conversation: ...</summary>
/// <context>{scene}</context>
/// <instructions>You are {name}...</instructions>
/// ```
///
/// `{{char}}` and `{{user}}` placeholders in card text are replaced by the
/// character and user names.
pub struct CharacterPromptBuilder;

impl CharacterPromptBuilder {
    pub fn build(ctx: &SessionContext) -> String {
        let character = &ctx.character;
        let expand = |text: &str| expand_placeholders(text.trim(), ctx);
        let mut sections = Vec::with_capacity(8);

        let mut card = Vec::new();
        if !character.system_prompt.trim().is_empty() {
            card.push(expand(&character.system_prompt));
        }
        card.push(format!("Name: {}", character.name));
        if !character.description.trim().is_empty() {
            card.push(expand(&character.description));
        }
        sections.push(format!("<character>\n{}\n</character>", card.join("\n")));

        if !character.personality.trim().is_empty() {
            sections.push(format!(
                "<personality>\n{}\n</personality>",
                expand(&character.personality)
            ));
        }

        if !character.scenario.trim().is_empty() {
            sections.push(format!(
                "<scenario>\n{}\n</scenario>",
                expand(&character.scenario)
            ));
        }

        let user_description = ctx.user.description.trim();
        if user_description.is_empty() {
            sections.push(format!("<user>\nName: {}\n</user>", ctx.user.name));
        } else {
            sections.push(format!(
                "<user>\nName: {}\n{}\n</user>",
                ctx.user.name,
                expand(user_description)
            ));
        }

        if !ctx.memories.is_empty() {
            let lines: Vec<String> = ctx.memories.iter().map(|m| format!("- {m}")).collect();
            sections.push(format!("<memories>\n{}\n</memories>", lines.join("\n")));
        }

        let summaries = ctx.conversation.summaries();
        if !summaries.is_empty() {
            let text: Vec<&str> = summaries.iter().map(|s| s.text.trim()).collect();
            sections.push(format!(
                "<summary>\nEarlier in this conversation:\n{}\n</summary>",
                text.join("\n\n")
            ));
        }

        if let Some(scene) = ctx.scene.as_deref() {
            sections.push(format!("<context>\n{}\n</context>", expand(scene)));
        }

        sections.push(format!(
            "<instructions>\n\
            You are {name}. Stay in character and reply only as {name}, never as {user}.\n\
            Your replies are spoken aloud: keep them short and conversational, without \
            stage directions or markup.\n\
            A message starting with [interrupts {name}] means {user} cut you off; your \
            previous line ends where they stopped listening.\n\
            Reply in the language of the {culture} locale.\n\
            </instructions>",
            name = character.name,
            user = ctx.user.name,
            culture = ctx.culture,
        ));

        sections.join("\n\n")
    }

    /// Unsummarized utterances as chat messages, oldest first.
    pub fn history(conversation: &Conversation) -> Vec<Message> {
        conversation
            .unsummarized()
            .map(|u| match u.role {
                MessageRole::Assistant => Message::assistant(u.text.clone()),
                _ => Message::user(u.text.clone()),
            })
            .collect()
    }
}

fn expand_placeholders(text: &str, ctx: &SessionContext) -> String {
    text.replace("{{char}}", &ctx.character.name)
        .replace("{{user}}", &ctx.user.name)
}

#[cfg(test)]
mod tests {
    use parley_types::character::{Character, UserProfile};
    use parley_types::conversation::{ConversationSummary, Utterance};
    use parley_types::speech::AudioFormat;
    use uuid::Uuid;

    use super::*;
    use crate::session::context::AudioRouting;

    fn context() -> SessionContext {
        let mut character = Character::new("kate", "Kate");
        character.description = "A ship engineer.".to_string();
        character.scenario = "{{char}} and {{user}} fix the engine.".to_string();
        SessionContext::new(
            Uuid::now_v7(),
            UserProfile {
                name: "Joe".to_string(),
                description: String::new(),
            },
            character,
            Conversation::new("kate"),
            AudioRouting {
                voice: None,
                format: AudioFormat::Wav,
            },
        )
    }

    #[test]
    fn test_build_includes_card_sections() {
        let prompt = CharacterPromptBuilder::build(&context());
        assert!(prompt.contains("<character>\nName: Kate\nA ship engineer.\n</character>"));
        assert!(prompt.contains("<scenario>\nKate and Joe fix the engine.\n</scenario>"));
        assert!(prompt.contains("<user>\nName: Joe\n</user>"));
        assert!(prompt.contains("You are Kate."));
        assert!(!prompt.contains("<personality>"));
        assert!(!prompt.contains("<memories>"));
    }

    #[test]
    fn test_build_includes_memories_summary_and_scene() {
        let mut ctx = context();
        ctx.memories = vec!["Kate has a cat.".to_string()];
        ctx.scene = Some("Night shift.".to_string());
        let conversation_id = ctx.conversation.id;
        ctx.conversation.fold_into_summary(
            ConversationSummary {
                id: Uuid::now_v7(),
                conversation_id,
                text: "Joe asked about the reactor.".to_string(),
                tokens: 7,
                utterance_count: 2,
                created_at: chrono::Utc::now(),
            },
            &[],
        );

        let prompt = CharacterPromptBuilder::build(&ctx);
        assert!(prompt.contains("<memories>\n- Kate has a cat.\n</memories>"));
        assert!(prompt.contains("Joe asked about the reactor."));
        assert!(prompt.contains("<context>\nNight shift.\n</context>"));
        let memories_at = prompt.find("<memories>").unwrap();
        let instructions_at = prompt.find("<instructions>").unwrap();
        assert!(memories_at < instructions_at);
    }

    #[test]
    fn test_history_skips_summarized_utterances() {
        let mut conversation = Conversation::new("kate");
        let id = conversation.id;
        let old = conversation
            .append(Utterance::new(id, MessageRole::User, "Joe", "Old"))
            .id;
        conversation.append(Utterance::new(id, MessageRole::Assistant, "Kate", "Reply"));
        conversation.fold_into_summary(
            ConversationSummary {
                id: Uuid::now_v7(),
                conversation_id: id,
                text: "s".to_string(),
                tokens: 1,
                utterance_count: 1,
                created_at: chrono::Utc::now(),
            },
            &[old],
        );

        let history = CharacterPromptBuilder::history(&conversation);
        assert_eq!(history, vec![Message::assistant("Reply")]);
    }
}
