//! Test doubles shared by the session tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_types::character::{Character, UserProfile};
use parley_types::config::ServerConfig;
use parley_types::conversation::{Conversation, ConversationSummary, Utterance};
use parley_types::error::{CharacterError, RepositoryError};
use parley_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};
use parley_types::protocol::ServerMessage;
use parley_types::speech::AudioFormat;
use uuid::Uuid;

use crate::generation::GenerationSettings;
use crate::generation::action::ActionSelector;
use crate::generation::reply::ReplyGenerator;
use crate::generation::summarizer::ConversationSummarizer;
use crate::hash::ContentHasher;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::token_budget::TokenBudget;
use crate::memory::KeywordMemoryBook;
use crate::recognition::DisabledSpeechRecognizer;
use crate::repository::character::CharacterRepository;
use crate::repository::conversation::ConversationRepository;
use crate::session::clock::ManualClock;
use crate::session::context::{AudioRouting, SessionContext};
use crate::session::orchestrator::{SessionOptions, SessionOrchestrator, SessionServices};
use crate::session::runner::SessionDependencies;
use crate::speech::box_generator::BoxSpeechGenerator;
use crate::speech::generator::{DeferredSpeechGenerator, SpeechSettings};
use crate::speech::registry::PendingSpeechRegistry;
use crate::tunnel::{ChannelTunnel, TunnelEndpoint};

/// One scripted LLM response.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(String),
    /// Never completes; only cancellation ends the call.
    Hang,
}

impl Step {
    pub fn reply(text: impl Into<String>) -> Self {
        Step::Reply(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Step::Fail(message.into())
    }
}

#[derive(Default)]
struct ScriptState {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

/// LLM provider answering from a fixed script, in call order.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<ScriptState>,
    capabilities: ProviderCapabilities,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        let provider = Self::default();
        provider.state.steps.lock().unwrap().extend(steps);
        provider
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.state.requests.lock().unwrap().push(request.clone());
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.state.steps.lock().unwrap().pop_front();

        match step {
            Some(Step::Reply(content)) => Ok(CompletionResponse {
                id: format!("resp-{}", self.calls()),
                content,
                model: request.model.clone(),
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 5,
                },
            }),
            Some(Step::Fail(message)) => Err(LlmError::Provider { message }),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(LlmError::Provider {
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// Conversation store kept in memory, in insertion order.
#[derive(Default)]
pub struct MemoryConversationRepository {
    conversations: Mutex<HashMap<Uuid, Conversation>>,
    utterances: Mutex<Vec<Utterance>>,
    summaries: Mutex<Vec<ConversationSummary>>,
}

impl MemoryConversationRepository {
    pub fn texts(&self) -> Vec<String> {
        self.utterances
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn utterance_count(&self) -> usize {
        self.utterances.lock().unwrap().len()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.lock().unwrap().len()
    }
}

impl ConversationRepository for MemoryConversationRepository {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let Some(conversation) = self.conversations.lock().unwrap().get(id).cloned() else {
            return Ok(None);
        };
        let utterances = self.list_utterances(id).await?;
        let summaries = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.conversation_id == *id)
            .cloned()
            .collect();
        Ok(Some(Conversation::restore(
            conversation.id,
            conversation.character_id,
            conversation.created_at,
            utterances,
            summaries,
        )))
    }

    async fn append_utterance(&self, utterance: &Utterance) -> Result<(), RepositoryError> {
        self.utterances.lock().unwrap().push(utterance.clone());
        Ok(())
    }

    async fn update_utterance(&self, utterance: &Utterance) -> Result<(), RepositoryError> {
        let mut utterances = self.utterances.lock().unwrap();
        let existing = utterances
            .iter_mut()
            .find(|u| u.id == utterance.id)
            .ok_or(RepositoryError::NotFound)?;
        existing.text = utterance.text.clone();
        existing.tokens = utterance.tokens;
        Ok(())
    }

    async fn list_utterances(&self, conversation_id: &Uuid) -> Result<Vec<Utterance>, RepositoryError> {
        Ok(self
            .utterances
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.conversation_id == *conversation_id)
            .cloned()
            .collect())
    }

    async fn save_summary(
        &self,
        summary: &ConversationSummary,
        folded: &[Uuid],
    ) -> Result<(), RepositoryError> {
        self.summaries.lock().unwrap().push(summary.clone());
        for utterance in self
            .utterances
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|u| folded.contains(&u.id))
        {
            utterance.summarized_by = Some(summary.id);
        }
        Ok(())
    }
}

/// Characters served from a fixed list.
pub struct StaticCharacters(Vec<Character>);

impl CharacterRepository for StaticCharacters {
    async fn get_character(&self, id: &str) -> Result<Character, CharacterError> {
        self.0
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CharacterError::NotFound(id.to_string()))
    }

    async fn list_characters(&self) -> Result<Vec<Character>, CharacterError> {
        Ok(self.0.clone())
    }
}

pub struct StdHasher;

impl ContentHasher for StdHasher {
    fn compute_hash(&self, content: &str) -> String {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

pub fn kate() -> Character {
    let mut character = Character::new("kate", "Kate");
    character.description = "A cheerful ship engineer.".to_string();
    character.voice = Some("kate".to_string());
    character
}

fn joe() -> UserProfile {
    UserProfile {
        name: "Joe".to_string(),
        description: String::new(),
    }
}

fn thinking_phrases() -> Vec<String> {
    vec!["Hmm...".to_string(), "Let me think.".to_string()]
}

pub struct HarnessOptions {
    pub script: Vec<Step>,
    pub character: Character,
    pub speech_enabled: bool,
    pub max_context_tokens: u32,
    pub keep_recent: usize,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            script: Vec::new(),
            character: kate(),
            speech_enabled: false,
            max_context_tokens: 32_768,
            keep_recent: 10,
        }
    }
}

/// An orchestrator wired to in-memory collaborators and a manual clock.
pub struct Harness {
    pub orchestrator: SessionOrchestrator<MemoryConversationRepository, ChannelTunnel>,
    pub provider: ScriptedProvider,
    pub repository: Arc<MemoryConversationRepository>,
    pub registry: PendingSpeechRegistry,
    pub clock: Arc<ManualClock>,
    pub endpoint: TunnelEndpoint,
}

impl Harness {
    pub fn new(options: HarnessOptions) -> Self {
        let provider = ScriptedProvider::new(options.script);
        let boxed = Arc::new(BoxLlmProvider::new(provider.clone()));
        let repository = Arc::new(MemoryConversationRepository::default());
        let registry = PendingSpeechRegistry::new();
        let clock = Arc::new(ManualClock::new());
        let (tunnel, endpoint) = ChannelTunnel::pair(16);
        let (recognition_tx, _recognition_rx) = tokio::sync::mpsc::unbounded_channel();

        let character = options.character;
        let conversation = Conversation::new(character.id.clone());
        let audio = AudioRouting {
            voice: character.voice.clone(),
            format: AudioFormat::Wav,
        };
        let memory = Arc::new(KeywordMemoryBook::new(character.memories.clone()));
        let speech = DeferredSpeechGenerator::new(
            registry.clone(),
            SpeechSettings {
                enabled: options.speech_enabled,
                service: "test".to_string(),
                voice: audio.voice.clone(),
                culture: character.culture.clone(),
                format: AudioFormat::Wav,
                public_base_url: "http://test".to_string(),
            },
        );
        let context = SessionContext::new(Uuid::now_v7(), joe(), character, conversation, audio);

        let settings = GenerationSettings {
            model: "test-model".to_string(),
            max_tokens: 100,
            temperature: 0.7,
        };
        let services = SessionServices {
            replies: ReplyGenerator::new(Arc::clone(&boxed), settings),
            actions: Some(ActionSelector::new(Arc::clone(&boxed), "test-model")),
            summarizer: Some(ConversationSummarizer::new(
                Arc::clone(&boxed),
                "test-model",
                TokenBudget::new(options.max_context_tokens),
                options.keep_recent,
            )),
            speech: BoxSpeechGenerator::new(speech),
            memory,
            recognizer: Arc::new(DisabledSpeechRecognizer),
            hasher: Arc::new(StdHasher),
            clock: clock.clone(),
        };

        let orchestrator = SessionOrchestrator::new(
            context,
            services,
            SessionOptions {
                thinking_speech: thinking_phrases(),
            },
            Arc::clone(&repository),
            Arc::new(tunnel),
            recognition_tx,
        );

        Self {
            orchestrator,
            provider,
            repository,
            registry,
            clock,
            endpoint,
        }
    }

    /// Everything the session has sent since the last call.
    pub fn messages(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.endpoint.messages.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Yield until the provider has been called `count` times.
    pub async fn wait_for_llm_calls(&self, count: usize) {
        while self.provider.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

/// Runner dependencies backed by in-memory collaborators.
pub fn test_dependencies(
    script: Vec<Step>,
    character: Character,
) -> (
    SessionDependencies<MemoryConversationRepository, StaticCharacters>,
    ScriptedProvider,
) {
    let provider = ScriptedProvider::new(script);
    let mut config = ServerConfig::default();
    config.profile = joe();
    config.server.public_base_url = "http://test".to_string();

    let deps = SessionDependencies {
        conversations: Arc::new(MemoryConversationRepository::default()),
        characters: Arc::new(StaticCharacters(vec![character])),
        provider: Arc::new(BoxLlmProvider::new(provider.clone())),
        speech_registry: PendingSpeechRegistry::new(),
        hasher: Arc::new(StdHasher),
        recognizer: Arc::new(DisabledSpeechRecognizer),
        clock: Arc::new(ManualClock::new()),
        config: Arc::new(config),
    };
    (deps, provider)
}
