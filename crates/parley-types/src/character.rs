//! Character persona types for Parley.
//!
//! A character is loaded from a TOML file in `{data_dir}/characters/` and
//! supplies the persona text the prompt builder turns into a system prompt.

use serde::{Deserialize, Serialize};

/// A persona the user converses with.
///
/// Format:
/// ```toml
/// name = "Kate"
/// description = "A cheerful ship engineer."
/// personality = "curious, warm, a little sarcastic"
/// scenario = "Kate and {{user}} are repairing the engine room."
/// first_line = "Oh, hey! Hand me that wrench?"
/// culture = "en-US"
/// voice = "kate"
///
/// [[memories]]
/// keywords = ["engine", "reactor"]
/// text = "Kate rebuilt the reactor coupling last week."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Slug derived from the file name (`kate.toml` -> `kate`).
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub scenario: String,
    /// Line the character says when a chat starts, if any.
    #[serde(default)]
    pub first_line: Option<String>,
    #[serde(default = "default_culture")]
    pub culture: String,
    /// Voice identifier passed to the speech back-end.
    #[serde(default)]
    pub voice: Option<String>,
    /// Keyword-triggered memory entries for this character.
    #[serde(default)]
    pub memories: Vec<MemoryEntry>,
}

fn default_culture() -> String {
    "en-US".to_string()
}

impl Character {
    /// A character with only an id and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system_prompt: String::new(),
            description: String::new(),
            personality: String::new(),
            scenario: String::new(),
            first_line: None,
            culture: default_culture(),
            voice: None,
            memories: Vec::new(),
        }
    }
}

/// A memory-book entry recalled when one of its keywords is mentioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub keywords: Vec<String>,
    pub text: String,
}

/// The human side of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default = "default_user_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

fn default_user_name() -> String {
    "User".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: default_user_name(),
            description: String::new(),
        }
    }
}
