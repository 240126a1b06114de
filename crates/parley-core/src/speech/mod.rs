//! Speech synthesis for session replies.
//!
//! Synthesis is deferred: a session registers a [`PendingSpeechEntry`] and
//! hands the client a fetch URL; the audio is produced only when the client
//! fetches it.
//!
//! [`PendingSpeechEntry`]: parley_types::speech::PendingSpeechEntry

pub mod box_generator;
pub mod fetch;
pub mod generator;
pub mod registry;
pub mod synthesizer;
