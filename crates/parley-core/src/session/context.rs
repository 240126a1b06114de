//! Per-session conversational state.

use parley_types::character::{Character, UserProfile};
use parley_types::conversation::Conversation;
use parley_types::speech::AudioFormat;
use uuid::Uuid;

/// Where and how a session's speech is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRouting {
    pub voice: Option<String>,
    pub format: AudioFormat,
}

/// Everything a session knows about the chat in progress.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user: UserProfile,
    pub character: Character,
    pub conversation: Conversation,
    /// Memories recalled for the current turn.
    pub memories: Vec<String>,
    /// Free-form scene description supplied by the client.
    pub scene: Option<String>,
    /// Action labels the character may choose from after replying.
    pub actions: Vec<String>,
    pub culture: String,
    pub audio: AudioRouting,
}

impl SessionContext {
    pub fn new(
        session_id: Uuid,
        user: UserProfile,
        character: Character,
        conversation: Conversation,
        audio: AudioRouting,
    ) -> Self {
        let culture = character.culture.clone();
        Self {
            session_id,
            user,
            character,
            conversation,
            memories: Vec::new(),
            scene: None,
            actions: Vec::new(),
            culture,
            audio,
        }
    }

    pub fn character_name(&self) -> &str {
        &self.character.name
    }

    pub fn user_name(&self) -> &str {
        &self.user.name
    }

    /// Apply a client context update. `None` leaves a field unchanged; an
    /// empty scene clears it.
    pub fn apply_update(&mut self, scene: Option<String>, actions: Option<Vec<String>>) {
        if let Some(scene) = scene {
            let scene = scene.trim().to_string();
            self.scene = (!scene.is_empty()).then_some(scene);
        }
        if let Some(actions) = actions {
            self.actions = actions
                .into_iter()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        let mut character = Character::new("kate", "Kate");
        character.culture = "fr-FR".to_string();
        SessionContext::new(
            Uuid::now_v7(),
            UserProfile::default(),
            character,
            Conversation::new("kate"),
            AudioRouting {
                voice: None,
                format: AudioFormat::Wav,
            },
        )
    }

    #[test]
    fn test_new_takes_culture_from_character() {
        let ctx = context();
        assert_eq!(ctx.culture, "fr-FR");
        assert_eq!(ctx.character_name(), "Kate");
        assert_eq!(ctx.user_name(), "User");
    }

    #[test]
    fn test_apply_update_partial() {
        let mut ctx = context();
        ctx.apply_update(
            Some("  A rainy cafe. ".to_string()),
            Some(vec!["wave".to_string(), " ".to_string(), "sit".to_string()]),
        );
        assert_eq!(ctx.scene.as_deref(), Some("A rainy cafe."));
        assert_eq!(ctx.actions, vec!["wave", "sit"]);

        ctx.apply_update(None, Some(Vec::new()));
        assert_eq!(ctx.scene.as_deref(), Some("A rainy cafe."));
        assert!(ctx.actions.is_empty());

        ctx.apply_update(Some(String::new()), None);
        assert!(ctx.scene.is_none());
    }
}
