//! Session orchestrator.
//!
//! Routes client messages and recognition events into operations on the
//! session's [`PreemptiveWorkQueue`]. Every operation runs under the session
//! state lock, reconciles the log against the current activity, and reports
//! its own failures to the client as a single error notice. A preempted
//! operation leaves the activity untouched so its successor can reconcile
//! against it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parley_types::activity::{Activity, ActivityPhase};
use parley_types::conversation::{Conversation, MessageRole, Utterance};
use parley_types::error::SessionError;
use parley_types::protocol::{ClientMessage, ServerMessage};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::activity::ActivityTracker;
use super::clock::Clock;
use super::context::SessionContext;
use super::queue::PreemptiveWorkQueue;
use super::reconciler::{Reconciliation, reconcile};
use crate::generation::action::ActionSelector;
use crate::generation::reply::ReplyGenerator;
use crate::generation::summarizer::ConversationSummarizer;
use crate::hash::ContentHasher;
use crate::memory::MemoryRecall;
use crate::recognition::{RecognitionEvent, SpeechRecognizer};
use crate::repository::conversation::ConversationRepository;
use crate::speech::box_generator::BoxSpeechGenerator;
use crate::speech::generator::estimate_duration;
use crate::tunnel::Tunnel;

/// Collaborators a session delegates to.
pub struct SessionServices {
    pub replies: ReplyGenerator,
    /// `None` disables action inference.
    pub actions: Option<ActionSelector>,
    /// `None` disables summarization.
    pub summarizer: Option<ConversationSummarizer>,
    pub speech: BoxSpeechGenerator,
    pub memory: Arc<dyn MemoryRecall>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub hasher: Arc<dyn ContentHasher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Filler lines registered as reusable speech at chat start.
    pub thinking_speech: Vec<String>,
}

struct SessionState {
    context: SessionContext,
    activity: ActivityTracker,
}

enum Transition {
    Idle,
    Generating,
    Speaking {
        text: String,
        duration: Duration,
        started_at: Option<Instant>,
    },
}

struct Inner<R, T> {
    session_id: Uuid,
    conversation_id: Uuid,
    state: Mutex<SessionState>,
    services: SessionServices,
    options: SessionOptions,
    repository: Arc<R>,
    tunnel: Arc<T>,
    recognition: mpsc::UnboundedSender<RecognitionEvent>,
}

/// Coordinates one chat session.
pub struct SessionOrchestrator<R, T> {
    inner: Arc<Inner<R, T>>,
    queue: PreemptiveWorkQueue,
}

impl<R, T> SessionOrchestrator<R, T>
where
    R: ConversationRepository + 'static,
    T: Tunnel,
{
    /// `recognition` is handed to the speech recognizer when the client
    /// starts listening; the session runner drains the other end.
    pub fn new(
        context: SessionContext,
        services: SessionServices,
        options: SessionOptions,
        repository: Arc<R>,
        tunnel: Arc<T>,
        recognition: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Self {
        let activity = ActivityTracker::new(Arc::clone(&services.clock));
        Self {
            inner: Arc::new(Inner {
                session_id: context.session_id,
                conversation_id: context.conversation.id,
                state: Mutex::new(SessionState { context, activity }),
                services,
                options,
                repository,
                tunnel,
                recognition,
            }),
            queue: PreemptiveWorkQueue::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn conversation_id(&self) -> Uuid {
        self.inner.conversation_id
    }

    /// Send the ready notice and, for a fresh conversation, the character's
    /// first line. Not preemptible.
    pub fn handle_start_chat(&self) {
        let inner = Arc::clone(&self.inner);
        self.queue.post("start_chat", move || async move {
            let result = inner.start_chat(CancellationToken::new()).await;
            inner.settle(result).await
        });
    }

    /// Route a client message. Returns immediately.
    pub fn handle_client_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::Send { text } => self.handle_user_message(text),
            ClientMessage::SpeechPlaybackStart {
                message_id,
                duration_secs,
            } => {
                let duration = duration_secs
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .filter(|duration| !duration.is_zero());
                self.handle_speech_playback_start(message_id, duration);
            }
            ClientMessage::SpeechPlaybackComplete { message_id } => {
                self.handle_speech_playback_complete(message_id)
            }
            ClientMessage::StartListening => self.start_listening(),
            ClientMessage::StopListening => self.inner.services.recognizer.stop(),
            ClientMessage::UpdateContext { context, actions } => {
                let inner = Arc::clone(&self.inner);
                self.queue.post("update_context", move || async move {
                    inner.state.lock().await.context.apply_update(context, actions);
                    Ok::<(), SessionError>(())
                });
            }
            ClientMessage::StartChat { .. } => {
                self.report_error(SessionError::InvalidMessage(
                    "chat already started".to_string(),
                ));
            }
        }
    }

    /// Queue a line of user text, preempting whatever is in flight.
    pub fn handle_user_message(&self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            debug!(session_id = %self.inner.session_id, "ignoring empty user message");
            return;
        }

        let inner = Arc::clone(&self.inner);
        self.queue.enqueue("user_message", move |cancel| async move {
            let result = inner.user_turn(text, cancel).await;
            inner.settle(result).await
        });
    }

    /// The client started playing a reply's audio of length `duration`,
    /// estimated from the reply text when `None`.
    ///
    /// The arrival time is captured now, so playback is timed from when the
    /// client reported it even if earlier work delays processing.
    pub fn handle_speech_playback_start(
        &self,
        message_id: Option<Uuid>,
        duration: Option<Duration>,
    ) {
        let started_at = self.inner.services.clock.now();
        let inner = Arc::clone(&self.inner);
        self.queue.post("speech_playback_start", move || async move {
            let result = inner.playback_started(message_id, duration, started_at).await;
            inner.settle(result).await
        });
    }

    pub fn handle_speech_playback_complete(&self, message_id: Option<Uuid>) {
        let inner = Arc::clone(&self.inner);
        self.queue.post("speech_playback_complete", move || async move {
            let result = inner.playback_completed(message_id).await;
            inner.settle(result).await
        });
    }

    /// Relay a recognizer event; final transcripts become user messages.
    pub async fn handle_recognition_event(&self, event: RecognitionEvent) {
        let notice = match &event {
            RecognitionEvent::Started => ServerMessage::RecognitionStarted,
            RecognitionEvent::Partial(text) => ServerMessage::RecognitionPartial { text: text.clone() },
            RecognitionEvent::Final(text) => ServerMessage::RecognitionComplete { text: text.clone() },
        };
        if let Err(e) = self.inner.tunnel.send(notice).await {
            warn!(session_id = %self.inner.session_id, error = %e, "failed to relay recognition event");
        }
        if let RecognitionEvent::Final(text) = event {
            self.handle_user_message(text);
        }
    }

    /// Report a failure that happened outside any operation.
    pub fn report_error(&self, error: SessionError) {
        let inner = Arc::clone(&self.inner);
        self.queue.post("report_error", move || async move {
            inner.report(&error).await;
            Ok::<(), SessionError>(())
        });
    }

    /// Wait for every queued operation to finish.
    pub async fn wait_for_pending(&self) {
        self.queue.drain().await;
    }

    /// Stop listening, cancel in-flight work and wait for the queue to empty.
    pub async fn shutdown(&self) {
        self.inner.services.recognizer.stop();
        self.queue.shutdown().await;
    }

    pub async fn conversation(&self) -> Conversation {
        self.inner.state.lock().await.context.conversation.clone()
    }

    pub async fn phase(&self) -> ActivityPhase {
        self.inner.state.lock().await.activity.phase()
    }

    fn start_listening(&self) {
        let recognizer = &self.inner.services.recognizer;
        match recognizer.start(self.inner.recognition.clone()) {
            Ok(()) => debug!(recognizer = recognizer.name(), "listening"),
            Err(e) => self.report_error(e.into()),
        }
    }
}

impl<R, T> Inner<R, T>
where
    R: ConversationRepository + 'static,
    T: Tunnel,
{
    async fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        self.tunnel.send(message).await.map_err(SessionError::from)
    }

    async fn report(&self, error: &SessionError) {
        warn!(session_id = %self.session_id, error = %error, "{}", error.summary());
        let notice = ServerMessage::Error {
            message: error.summary().to_string(),
            details: error.to_string(),
        };
        if let Err(e) = self.tunnel.send(notice).await {
            debug!(session_id = %self.session_id, error = %e, "could not deliver error notice");
        }
    }

    /// Turn an operation's failure into one error notice and an idle session.
    /// Preemption is passed through untouched.
    async fn settle(&self, result: Result<(), SessionError>) -> Result<(), SessionError> {
        match result {
            Err(e) if !e.is_cancelled() => {
                self.report(&e).await;
                let mut state = self.state.lock().await;
                if let Err(e) = self.transition(&mut state, Transition::Idle).await {
                    debug!(session_id = %self.session_id, error = %e, "could not announce idle");
                }
                Ok(())
            }
            other => other,
        }
    }

    async fn transition(
        &self,
        state: &mut SessionState,
        to: Transition,
    ) -> Result<(), SessionError> {
        let before = state.activity.phase();
        match to {
            Transition::Idle => state.activity.enter_idle(),
            Transition::Generating => state.activity.enter_generating(),
            Transition::Speaking {
                text,
                duration,
                started_at: Some(started_at),
            } => state.activity.enter_speaking_at(text, duration, started_at),
            Transition::Speaking { text, duration, .. } => {
                state.activity.enter_speaking(text, duration)
            }
        }

        let after = state.activity.phase();
        if before != after {
            self.send(ServerMessage::Phase { phase: after }).await?;
        }
        Ok(())
    }

    async fn start_chat(&self, cancel: CancellationToken) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let voice = state.context.audio.voice.clone().unwrap_or_default();
        let mut thinking_speech = Vec::with_capacity(self.options.thinking_speech.len());
        for phrase in &self.options.thinking_speech {
            let id = self.services.hasher.compute_hash(&format!("{voice}\n{phrase}"));
            match self.services.speech.create_speech(phrase, &id, true, &cancel).await {
                Ok(Some(reference)) => thinking_speech.push(reference.url),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "could not register thinking speech"),
            }
        }

        self.send(ServerMessage::Ready {
            session_id: self.session_id,
            conversation_id: state.context.conversation.id,
            character_name: state.context.character_name().to_string(),
            thinking_speech,
        })
        .await?;
        info!(
            session_id = %self.session_id,
            conversation_id = %state.context.conversation.id,
            character = %state.context.character.id,
            "chat started"
        );

        let first_line = state
            .context
            .character
            .first_line
            .as_deref()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string);
        if let Some(line) = first_line {
            if state.context.conversation.is_empty() {
                self.speak_reply(state, line, &cancel).await?;
            }
        }
        Ok(())
    }

    async fn user_turn(&self, text: String, cancel: CancellationToken) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let elapsed = state.activity.elapsed();
        let outcome = reconcile(
            &mut state.context.conversation,
            state.activity.state(),
            elapsed,
            &state.context.user.name,
            &state.context.character.name,
            &text,
        );
        debug!(session_id = %self.session_id, phase = %state.activity.phase(), ?elapsed, "user message reconciled");
        self.record_reconciliation(outcome).await?;

        self.transition(state, Transition::Generating).await?;
        state.context.memories = self.services.memory.query_fast(&state.context.conversation);

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            reply = self.services.replies.generate_reply(&state.context) => reply?,
        };

        self.speak_reply(state, reply, &cancel).await?;
        self.infer_action(state, &cancel).await?;
        self.summarize(state, &cancel).await
    }

    async fn record_reconciliation(&self, outcome: Reconciliation) -> Result<(), SessionError> {
        match outcome {
            Reconciliation::Appended { utterance } => self.record_user_utterance(utterance).await,
            Reconciliation::Merged { utterance } => self.record_rewrite(utterance).await,
            Reconciliation::Interrupted {
                truncated,
                utterance,
            } => {
                if let Some(truncated) = truncated {
                    self.record_rewrite(truncated).await?;
                }
                self.record_user_utterance(utterance).await
            }
        }
    }

    async fn record_user_utterance(&self, utterance: Utterance) -> Result<(), SessionError> {
        self.repository.append_utterance(&utterance).await?;
        self.send(ServerMessage::UserMessage {
            message_id: utterance.id,
            text: utterance.text,
        })
        .await
    }

    async fn record_rewrite(&self, utterance: Utterance) -> Result<(), SessionError> {
        self.repository.update_utterance(&utterance).await?;
        self.send(ServerMessage::Update {
            message_id: utterance.id,
            text: utterance.text,
        })
        .await
    }

    /// Append a character line, then speak it if speech is available.
    async fn speak_reply(
        &self,
        state: &mut SessionState,
        text: String,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let conversation = &mut state.context.conversation;
        let utterance = Utterance::new(
            conversation.id,
            MessageRole::Assistant,
            state.context.character.name.clone(),
            text,
        );
        let utterance = conversation.append(utterance).clone();
        self.repository.append_utterance(&utterance).await?;
        self.send(ServerMessage::Reply {
            message_id: utterance.id,
            sender: utterance.sender.clone(),
            text: utterance.text.clone(),
        })
        .await?;

        let speech = self
            .services
            .speech
            .create_speech(&utterance.text, &utterance.id.to_string(), false, cancel)
            .await?;
        match speech {
            Some(reference) => {
                self.send(ServerMessage::Speech {
                    message_id: utterance.id,
                    url: reference.url,
                })
                .await?;
                let duration = reference
                    .duration
                    .unwrap_or_else(|| estimate_duration(&utterance.text));
                self.transition(
                    state,
                    Transition::Speaking {
                        text: utterance.text,
                        duration,
                        started_at: None,
                    },
                )
                .await
            }
            None => self.transition(state, Transition::Idle).await,
        }
    }

    async fn infer_action(
        &self,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let Some(selector) = &self.services.actions else {
            return Ok(());
        };
        if state.context.actions.is_empty() {
            return Ok(());
        }

        let action = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            action = selector.select_action(&state.context) => action,
        };
        match action {
            Ok(Some(name)) => {
                info!(session_id = %self.session_id, action = %name, "action selected");
                self.send(ServerMessage::Action { name }).await
            }
            Ok(None) => Ok(()),
            // The reply already went out; only tell the client.
            Err(e) => {
                self.report(&e.into()).await;
                Ok(())
            }
        }
    }

    async fn summarize(
        &self,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let Some(summarizer) = &self.services.summarizer else {
            return Ok(());
        };
        if !summarizer.should_summarize(&state.context.conversation) {
            return Ok(());
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SessionError::Cancelled),
            result = summarizer.summarize(&state.context.conversation) => result,
        };
        match result {
            Ok(Some(folded)) => {
                self.repository
                    .save_summary(&folded.summary, &folded.folded)
                    .await?;
                info!(
                    session_id = %self.session_id,
                    folded = folded.folded.len(),
                    summary_tokens = folded.summary.tokens,
                    "conversation summarized"
                );
                state
                    .context
                    .conversation
                    .fold_into_summary(folded.summary, &folded.folded);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "summarization failed");
                Ok(())
            }
        }
    }

    async fn playback_started(
        &self,
        message_id: Option<Uuid>,
        duration: Option<Duration>,
        started_at: Instant,
    ) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.activity.phase() == ActivityPhase::Generating {
            debug!(session_id = %self.session_id, "playback start while generating, ignored");
            return Ok(());
        }

        let line = state
            .context
            .conversation
            .last()
            .filter(|u| u.role == MessageRole::Assistant)
            .filter(|u| message_id.is_none_or(|id| id == u.id))
            .map(|u| u.text.clone());
        let Some(text) = line else {
            debug!(session_id = %self.session_id, ?message_id, "playback start for a stale reply, ignored");
            return Ok(());
        };

        let duration = duration.unwrap_or_else(|| estimate_duration(&text));
        self.transition(
            state,
            Transition::Speaking {
                text,
                duration,
                started_at: Some(started_at),
            },
        )
        .await
    }

    async fn playback_completed(&self, message_id: Option<Uuid>) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if !matches!(state.activity.state().activity, Activity::Speaking(_)) {
            return Ok(());
        }

        let current = state
            .context
            .conversation
            .last()
            .filter(|u| u.role == MessageRole::Assistant)
            .is_some_and(|u| message_id.is_none_or(|id| id == u.id));
        if current {
            self.transition(state, Transition::Idle).await?;
        }
        Ok(())
    }
}
