//! Application state wiring all adapters together.
//!
//! The session runner and speech fetcher are generic over repository and
//! synthesizer traits; AppState pins them to the concrete infra adapters.

use std::path::PathBuf;
use std::sync::Arc;

use parley_core::hash::ContentHasher;
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::recognition::DisabledSpeechRecognizer;
use parley_core::session::clock::SystemClock;
use parley_core::session::runner::SessionDependencies;
use parley_core::speech::fetch::SpeechFetcher;
use parley_core::speech::registry::PendingSpeechRegistry;
use parley_infra::crypto::hash::Sha256ContentHasher;
use parley_infra::filesystem::characters_dir;
use parley_infra::filesystem::character::TomlCharacterRepository;
use parley_infra::llm::create_provider;
use parley_infra::speech::http::HttpSpeechSynthesizer;
use parley_infra::sqlite::conversation::SqliteConversationRepository;
use parley_infra::sqlite::pool::{DatabasePool, database_url};
use parley_types::config::ServerConfig;
use tokio_util::sync::CancellationToken;

pub type ConcreteSessionDependencies =
    SessionDependencies<SqliteConversationRepository, TomlCharacterRepository>;

pub type ConcreteSpeechFetcher = SpeechFetcher<HttpSpeechSynthesizer>;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db_pool: DatabasePool,
    pub conversations: Arc<SqliteConversationRepository>,
    pub characters: Arc<TomlCharacterRepository>,
    pub provider: Arc<BoxLlmProvider>,
    pub speech_registry: PendingSpeechRegistry,
    pub speech: Arc<ConcreteSpeechFetcher>,
    pub hasher: Arc<Sha256ContentHasher>,
    /// Cancelled on server shutdown; every session runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Connect to the database and wire adapters for `data_dir`.
    pub async fn init(data_dir: PathBuf, config: ServerConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(characters_dir(&data_dir)).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let provider = create_provider(&config.llm)?;

        let speech_registry = PendingSpeechRegistry::new();
        let synthesizer = HttpSpeechSynthesizer::new(&config.speech)?;
        let speech = SpeechFetcher::new(speech_registry.clone(), synthesizer);

        tracing::info!(
            data_dir = %data_dir.display(),
            provider = provider.name(),
            model = %config.llm.model,
            speech = config.speech.enabled,
            "application state initialized"
        );

        Ok(Self {
            conversations: Arc::new(SqliteConversationRepository::new(db_pool.clone())),
            characters: Arc::new(TomlCharacterRepository::new(&data_dir)),
            provider: Arc::new(provider),
            speech_registry,
            speech: Arc::new(speech),
            hasher: Arc::new(Sha256ContentHasher::new()),
            shutdown: CancellationToken::new(),
            config: Arc::new(config),
            db_pool,
        })
    }

    /// Collaborators for one client session.
    pub fn session_dependencies(&self) -> ConcreteSessionDependencies {
        let hasher: Arc<dyn ContentHasher> = self.hasher.clone();
        SessionDependencies {
            conversations: Arc::clone(&self.conversations),
            characters: Arc::clone(&self.characters),
            provider: Arc::clone(&self.provider),
            speech_registry: self.speech_registry.clone(),
            hasher,
            recognizer: Arc::new(DisabledSpeechRecognizer),
            clock: Arc::new(SystemClock),
            config: Arc::clone(&self.config),
        }
    }
}
