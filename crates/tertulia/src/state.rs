use std::sync::Arc;

use anyhow::Result;
use tertulia_core::retrieval::{
    DocumentSplitter, Embedder, HashingEmbeddingProvider, Retriever,
};
use tertulia_core::{AgentBuilder, ModelClient};
use tertulia_openai_model::{
    OpenAIConfigBuilder, OpenAIEmbeddingProvider, OpenAIProvider,
};

use crate::config::{EmbeddingBackend, Settings};
use crate::services::{AssistantService, ExplainService, InvoiceService, RagService};
use crate::tools::builtin_registry;
use crate::trello::{BoardService, TrelloClient};

/// The remote collaborators, already wrapped in their type-erased clients.
pub struct Backends {
    /// Serves `/chat`.
    pub assistant_model: ModelClient,
    /// Serves the RAG, explain and invoice endpoints.
    pub openai_model: ModelClient,
    pub embedder: Embedder,
    pub board: Arc<dyn BoardService>,
}

impl Backends {
    pub fn from_settings(settings: &Settings) -> Self {
        let openai_config = settings.openai.provider_config();
        let embedding = &settings.rag.embedding;
        let embedder = match embedding.provider {
            EmbeddingBackend::Hashing => {
                Embedder::new(HashingEmbeddingProvider::new(embedding.dimension))
            }
            EmbeddingBackend::OpenAI => {
                let config = OpenAIConfigBuilder::with_api_key(&settings.openai.api_key)
                    .with_base_url(&settings.openai.base_url)
                    .with_model(&embedding.model)
                    .build();
                Embedder::new(OpenAIEmbeddingProvider::new(config, embedding.dimension))
            }
        };
        Self {
            assistant_model: ModelClient::new(OpenAIProvider::new(
                settings.gemini.provider_config(),
            )),
            openai_model: ModelClient::new(OpenAIProvider::new(openai_config)),
            embedder,
            board: Arc::new(TrelloClient::new(settings.trello.clone())),
        }
    }
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<AssistantService>,
    pub rag: Arc<RagService>,
    pub explain: Arc<ExplainService>,
    pub invoice: Arc<InvoiceService>,
}

impl AppState {
    /// Wires the services to the real backends.
    ///
    /// Must be called within a Tokio runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::assemble(settings, Backends::from_settings(settings))
    }

    /// Wires the services to `backends`, applying the configured default
    /// parameters to both model clients.
    ///
    /// Must be called within a Tokio runtime.
    pub fn assemble(settings: &Settings, backends: Backends) -> Result<Self> {
        let Backends {
            assistant_model,
            openai_model,
            embedder,
            board,
        } = backends;
        let assistant_model =
            assistant_model.with_defaults(settings.gemini.default_parameters());
        let openai_model = openai_model.with_defaults(settings.openai.default_parameters());

        let tools = Arc::new(builtin_registry(board)?);
        let assistant = AssistantService::new(
            assistant_model,
            tools,
            settings.assistant.clone(),
        );

        let rag_settings = &settings.rag;
        let retriever = Retriever::new(embedder)
            .with_splitter(DocumentSplitter::new(rag_settings.chunk_size))
            .with_max_results(rag_settings.max_results)
            .with_min_score(rag_settings.min_score);
        let rag_agent = AgentBuilder::with_model_client(openai_model.clone())
            .memory_capacity(rag_settings.memory_capacity)
            .build();

        Ok(Self {
            assistant: Arc::new(assistant),
            rag: Arc::new(RagService::new(rag_agent, retriever)),
            explain: Arc::new(ExplainService::new(openai_model.clone(), &settings.explain)),
            invoice: Arc::new(InvoiceService::new(openai_model, &settings.invoice)),
        })
    }
}
