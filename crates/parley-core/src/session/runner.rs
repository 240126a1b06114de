//! Drives one client session over a [`Tunnel`].
//!
//! The first message must be `start_chat`; anything else is rejected with an
//! error notice until it arrives. After that, client messages and
//! recognition events are routed to the [`SessionOrchestrator`] until the
//! client goes away or the server shuts down, at which point in-flight work
//! is cancelled and the queue drained.

use std::sync::Arc;

use parley_types::config::ServerConfig;
use parley_types::conversation::Conversation;
use parley_types::error::{RepositoryError, SessionError, TunnelError};
use parley_types::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::clock::Clock;
use super::context::{AudioRouting, SessionContext};
use super::orchestrator::{SessionOptions, SessionOrchestrator, SessionServices};
use crate::generation::GenerationSettings;
use crate::generation::action::ActionSelector;
use crate::generation::reply::ReplyGenerator;
use crate::generation::summarizer::ConversationSummarizer;
use crate::hash::ContentHasher;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::token_budget::TokenBudget;
use crate::memory::KeywordMemoryBook;
use crate::recognition::SpeechRecognizer;
use crate::repository::character::CharacterRepository;
use crate::repository::conversation::ConversationRepository;
use crate::speech::box_generator::BoxSpeechGenerator;
use crate::speech::generator::{DeferredSpeechGenerator, SpeechSettings};
use crate::speech::registry::PendingSpeechRegistry;
use crate::tunnel::Tunnel;

/// Server-wide collaborators every session is built from.
pub struct SessionDependencies<R, C> {
    pub conversations: Arc<R>,
    pub characters: Arc<C>,
    pub provider: Arc<BoxLlmProvider>,
    pub speech_registry: PendingSpeechRegistry,
    pub hasher: Arc<dyn ContentHasher>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ServerConfig>,
}

impl<R, C> Clone for SessionDependencies<R, C> {
    fn clone(&self) -> Self {
        Self {
            conversations: Arc::clone(&self.conversations),
            characters: Arc::clone(&self.characters),
            provider: Arc::clone(&self.provider),
            speech_registry: self.speech_registry.clone(),
            hasher: Arc::clone(&self.hasher),
            recognizer: Arc::clone(&self.recognizer),
            clock: Arc::clone(&self.clock),
            config: Arc::clone(&self.config),
        }
    }
}

/// Run a session until the client disconnects or `shutdown` fires.
pub async fn run_session<R, C, T>(
    tunnel: Arc<T>,
    deps: SessionDependencies<R, C>,
    shutdown: CancellationToken,
) -> Result<(), SessionError>
where
    R: ConversationRepository + 'static,
    C: CharacterRepository,
    T: Tunnel,
{
    let session_id = Uuid::now_v7();
    let span = info_span!("session", session.id = %session_id);
    drive(session_id, tunnel, deps, shutdown).instrument(span).await
}

async fn drive<R, C, T>(
    session_id: Uuid,
    tunnel: Arc<T>,
    deps: SessionDependencies<R, C>,
    shutdown: CancellationToken,
) -> Result<(), SessionError>
where
    R: ConversationRepository + 'static,
    C: CharacterRepository,
    T: Tunnel,
{
    let Some(context) = await_start_chat(session_id, tunnel.as_ref(), &deps, &shutdown).await?
    else {
        info!("client left before starting a chat");
        return Ok(());
    };

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let services = build_services(&deps, &context);
    let options = SessionOptions {
        thinking_speech: deps.config.speech.thinking_speech.clone(),
    };
    let orchestrator = SessionOrchestrator::new(
        context,
        services,
        options,
        Arc::clone(&deps.conversations),
        Arc::clone(&tunnel),
        events_tx,
    );
    orchestrator.handle_start_chat();

    loop {
        tokio::select! {
            received = tunnel.receive(&shutdown) => match received {
                Ok(Some(message)) => orchestrator.handle_client_message(message),
                Ok(None) => break,
                Err(TunnelError::Serialization(e)) => {
                    warn!(error = %e, "malformed client message");
                    orchestrator.report_error(SessionError::InvalidMessage(e));
                }
                Err(e) => {
                    warn!(error = %e, "tunnel failed");
                    break;
                }
            },
            Some(event) = events_rx.recv() => orchestrator.handle_recognition_event(event).await,
        }
    }

    orchestrator.shutdown().await;
    info!(conversation_id = %orchestrator.conversation_id(), "session closed");
    Ok(())
}

/// Wait for a `start_chat` that opens successfully. Returns `None` if the
/// client leaves first.
async fn await_start_chat<R, C, T>(
    session_id: Uuid,
    tunnel: &T,
    deps: &SessionDependencies<R, C>,
    shutdown: &CancellationToken,
) -> Result<Option<SessionContext>, SessionError>
where
    R: ConversationRepository,
    C: CharacterRepository,
    T: Tunnel,
{
    loop {
        let rejection = match tunnel.receive(shutdown).await {
            Ok(Some(ClientMessage::StartChat {
                character_id,
                conversation_id,
            })) => match open_chat(session_id, deps, &character_id, conversation_id).await {
                Ok(context) => return Ok(Some(context)),
                Err(e) => e,
            },
            Ok(Some(_)) => SessionError::InvalidMessage("chat not started".to_string()),
            Ok(None) => return Ok(None),
            Err(TunnelError::Serialization(e)) => SessionError::InvalidMessage(e),
            Err(e) => return Err(e.into()),
        };

        warn!(error = %rejection, "rejected message before chat start");
        tunnel
            .send(ServerMessage::Error {
                message: rejection.summary().to_string(),
                details: rejection.to_string(),
            })
            .await?;
    }
}

/// Load the character and open (or resume) its conversation.
async fn open_chat<R, C>(
    session_id: Uuid,
    deps: &SessionDependencies<R, C>,
    character_id: &str,
    conversation_id: Option<Uuid>,
) -> Result<SessionContext, SessionError>
where
    R: ConversationRepository,
    C: CharacterRepository,
{
    let character = deps.characters.get_character(character_id).await?;

    let conversation = match conversation_id {
        Some(id) => {
            let conversation = deps
                .conversations
                .get_conversation(&id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            if conversation.character_id != character.id {
                return Err(SessionError::InvalidMessage(format!(
                    "conversation {id} belongs to another character"
                )));
            }
            info!(conversation_id = %id, utterances = conversation.len(), "resuming conversation");
            conversation
        }
        None => {
            let conversation = Conversation::new(character.id.clone());
            deps.conversations.create_conversation(&conversation).await?;
            conversation
        }
    };

    let config = &deps.config;
    let audio = AudioRouting {
        voice: character
            .voice
            .clone()
            .or_else(|| config.speech.default_voice.clone()),
        format: config.speech.format,
    };
    Ok(SessionContext::new(
        session_id,
        config.profile.clone(),
        character,
        conversation,
        audio,
    ))
}

fn build_services<R, C>(deps: &SessionDependencies<R, C>, context: &SessionContext) -> SessionServices {
    let config = &deps.config;
    let speech = DeferredSpeechGenerator::new(
        deps.speech_registry.clone(),
        SpeechSettings {
            enabled: config.speech.enabled,
            service: config.speech.service.clone(),
            voice: context.audio.voice.clone(),
            culture: context.culture.clone(),
            format: context.audio.format,
            public_base_url: config.server.public_base_url.clone(),
        },
    );

    let settings = GenerationSettings::from(&config.llm);
    let max_context = config
        .llm
        .max_context_tokens
        .min(deps.provider.capabilities().max_context_tokens);
    let summarizer = config.summarization.enabled.then(|| {
        ConversationSummarizer::new(
            Arc::clone(&deps.provider),
            settings.model.clone(),
            TokenBudget::new(max_context),
            config.summarization.keep_recent,
        )
    });

    SessionServices {
        actions: Some(ActionSelector::new(
            Arc::clone(&deps.provider),
            settings.model.clone(),
        )),
        replies: ReplyGenerator::new(Arc::clone(&deps.provider), settings),
        summarizer,
        speech: BoxSpeechGenerator::new(speech),
        memory: Arc::new(KeywordMemoryBook::new(context.character.memories.clone())),
        recognizer: Arc::clone(&deps.recognizer),
        hasher: Arc::clone(&deps.hasher),
        clock: Arc::clone(&deps.clock),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parley_types::protocol::ServerMessage;

    use super::*;
    use crate::testing::{Step, kate, test_dependencies};
    use crate::tunnel::{ChannelTunnel, TunnelEndpoint};

    async fn next_message(endpoint: &mut TunnelEndpoint) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), endpoint.messages.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("tunnel closed")
    }

    async fn send(endpoint: &TunnelEndpoint, frame: &str) {
        endpoint.frames.send(frame.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_messages_before_start_chat_are_rejected() {
        let (deps, _provider) = test_dependencies(vec![Step::reply("Hi Joe.")], kate());
        let (tunnel, mut endpoint) = ChannelTunnel::pair(8);
        let session = tokio::spawn(run_session(
            Arc::new(tunnel),
            deps.clone(),
            CancellationToken::new(),
        ));

        send(&endpoint, r#"{"type":"send","text":"too early"}"#).await;
        match next_message(&mut endpoint).await {
            ServerMessage::Error { message, .. } => assert_eq!(message, "Message rejected"),
            other => panic!("expected error, got {other:?}"),
        }

        send(&endpoint, r#"{"type":"start_chat","character_id":"kate"}"#).await;
        assert!(matches!(
            next_message(&mut endpoint).await,
            ServerMessage::Ready { .. }
        ));

        send(&endpoint, r#"{"type":"send","text":"Hello"}"#).await;
        assert!(matches!(
            next_message(&mut endpoint).await,
            ServerMessage::UserMessage { .. }
        ));
        loop {
            if let ServerMessage::Reply { text, .. } = next_message(&mut endpoint).await {
                assert_eq!(text, "Hi Joe.");
                break;
            }
        }

        drop(endpoint);
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_character_keeps_waiting_for_start_chat() {
        let (deps, _provider) = test_dependencies(Vec::new(), kate());
        let (tunnel, mut endpoint) = ChannelTunnel::pair(8);
        let session = tokio::spawn(run_session(
            Arc::new(tunnel),
            deps,
            CancellationToken::new(),
        ));

        send(&endpoint, r#"{"type":"start_chat","character_id":"nobody"}"#).await;
        match next_message(&mut endpoint).await {
            ServerMessage::Error { message, details } => {
                assert_eq!(message, "Character could not be loaded");
                assert!(details.contains("nobody"));
            }
            other => panic!("expected error, got {other:?}"),
        }

        send(&endpoint, r#"{"type":"start_chat","character_id":"kate"}"#).await;
        assert!(matches!(
            next_message(&mut endpoint).await,
            ServerMessage::Ready { .. }
        ));

        drop(endpoint);
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_frame_after_start_is_reported() {
        let (deps, _provider) = test_dependencies(Vec::new(), kate());
        let (tunnel, mut endpoint) = ChannelTunnel::pair(8);
        let shutdown = CancellationToken::new();
        let session = tokio::spawn(run_session(Arc::new(tunnel), deps, shutdown.clone()));

        send(&endpoint, r#"{"type":"start_chat","character_id":"kate"}"#).await;
        assert!(matches!(
            next_message(&mut endpoint).await,
            ServerMessage::Ready { .. }
        ));

        send(&endpoint, r#"{"type":"dance"}"#).await;
        match next_message(&mut endpoint).await {
            ServerMessage::Error { message, .. } => assert_eq!(message, "Message rejected"),
            other => panic!("expected error, got {other:?}"),
        }

        shutdown.cancel();
        session.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_resumes_existing_conversation() {
        let (deps, _provider) = test_dependencies(Vec::new(), kate());
        let conversation = Conversation::new("kate");
        deps.conversations
            .create_conversation(&conversation)
            .await
            .unwrap();

        let (tunnel, mut endpoint) = ChannelTunnel::pair(8);
        let session = tokio::spawn(run_session(
            Arc::new(tunnel),
            deps,
            CancellationToken::new(),
        ));
        send(
            &endpoint,
            &format!(
                r#"{{"type":"start_chat","character_id":"kate","conversation_id":"{}"}}"#,
                conversation.id
            ),
        )
        .await;

        match next_message(&mut endpoint).await {
            ServerMessage::Ready {
                conversation_id, ..
            } => assert_eq!(conversation_id, conversation.id),
            other => panic!("expected ready, got {other:?}"),
        }
        drop(endpoint);
        session.await.unwrap().unwrap();
    }
}
