//! Speech synthesis types.
//!
//! A [`PendingSpeechEntry`] is a registered-but-not-yet-synthesized request;
//! the audio is produced when the client first fetches it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Audio container the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
}

impl AudioFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::Wav
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Wav => write!(f, "wav"),
            AudioFormat::Mp3 => write!(f, "mp3"),
            AudioFormat::Ogg => write!(f, "ogg"),
        }
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" => Ok(AudioFormat::Ogg),
            other => Err(format!("invalid audio format: '{other}'")),
        }
    }
}

/// A speech request waiting for its first fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSpeechEntry {
    /// Opaque identifier used in the fetch URL.
    pub id: String,
    /// Speech back-end name.
    pub service: String,
    pub voice: Option<String>,
    pub culture: String,
    pub text: String,
    pub format: AudioFormat,
    /// Reusable entries survive fetches; others are retrievable once.
    pub reusable: bool,
    pub created_at: DateTime<Utc>,
}

/// Where the client can fetch a synthesized line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechReference {
    pub id: String,
    pub url: String,
    /// Playback duration when the back-end knows it up front.
    pub duration: Option<Duration>,
}
