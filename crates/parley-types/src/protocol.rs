//! Wire protocol between a client and its session.
//!
//! Both directions are JSON text frames tagged by `"type"` (snake_case).
//! Unknown or malformed client frames are rejected by the session runner
//! without ending the session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::ActivityPhase;

/// A frame sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a chat with a character, optionally resuming a conversation.
    StartChat {
        character_id: String,
        #[serde(default)]
        conversation_id: Option<Uuid>,
    },
    /// A line of user text.
    Send { text: String },
    /// The client started playing a reply's audio. Without a usable
    /// `duration_secs` the session estimates one from the reply text.
    SpeechPlaybackStart {
        #[serde(default)]
        message_id: Option<Uuid>,
        #[serde(default)]
        duration_secs: Option<f64>,
    },
    /// The client finished playing a reply's audio.
    SpeechPlaybackComplete {
        #[serde(default)]
        message_id: Option<Uuid>,
    },
    StartListening,
    StopListening,
    /// Replace the scene context and/or the available action labels.
    UpdateContext {
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        actions: Option<Vec<String>>,
    },
}

/// A frame sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The session is ready; `thinking_speech` holds fetch URLs for filler lines.
    Ready {
        session_id: Uuid,
        conversation_id: Uuid,
        character_name: String,
        thinking_speech: Vec<String>,
    },
    /// A user utterance was appended to the log.
    UserMessage { message_id: Uuid, text: String },
    /// An existing utterance's text was rewritten in place.
    Update { message_id: Uuid, text: String },
    /// A character reply was appended to the log.
    Reply {
        message_id: Uuid,
        sender: String,
        text: String,
    },
    /// Audio for a reply is available at `url`.
    Speech { message_id: Uuid, url: String },
    /// The character chose an action.
    Action { name: String },
    /// The session moved to a new activity phase.
    Phase { phase: ActivityPhase },
    RecognitionStarted,
    RecognitionPartial { text: String },
    RecognitionComplete { text: String },
    /// A non-fatal failure; the session keeps running.
    Error { message: String, details: String },
}
