//! Layered settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. the built-in defaults in `config/default.toml`,
//! 2. `tertulia.toml` in the working directory, or the file named by the
//!    `TERTULIA_CONFIG` variable,
//! 3. `TERTULIA__<SECTION>__<KEY>` environment variables,
//! 4. the conventional credential variables, such as `OPENAI_API_KEY`.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use tertulia_model::ModelParameters;
use tertulia_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");
pub const DEFAULT_CONFIG_PATH: &str = "tertulia.toml";

/// Variables that override a single key, as `(variable, key)`.
const CONVENTIONAL_VARS: [(&str, &str); 5] = [
    ("GEMINI_API_KEY", "gemini.api_key"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("TRELLO_API_KEY", "trello.api_key"),
    ("TRELLO_TOKEN", "trello.token"),
    ("TRELLO_BOARD_ID", "trello.board_id"),
];

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub gemini: ChatModelSettings,
    pub openai: ChatModelSettings,
    pub assistant: AssistantSettings,
    pub rag: RagSettings,
    pub explain: ExplainSettings,
    pub invoice: InvoiceSettings,
    pub trello: TrelloSettings,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// An OpenAI-compatible chat endpoint and its default parameters.
#[derive(Clone, Deserialize)]
pub struct ChatModelSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

impl ChatModelSettings {
    pub fn provider_config(&self) -> OpenAIConfig {
        OpenAIConfigBuilder::with_api_key(&self.api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .build()
    }

    pub fn default_parameters(&self) -> ModelParameters {
        ModelParameters {
            model_name: Some(self.model.clone()),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

impl std::fmt::Debug for ChatModelSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatModelSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AssistantSettings {
    pub system_prompt: String,
    pub memory_capacity: usize,
    pub max_tool_rounds: usize,
    pub max_sessions: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RagSettings {
    pub document_path: PathBuf,
    pub chunk_size: usize,
    pub max_results: usize,
    pub min_score: f64,
    pub memory_capacity: usize,
    pub probe_text: String,
    pub embedding: EmbeddingSettings,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local feature hashing, no network involved.
    Hashing,
    /// The `/embeddings` endpoint of the `[openai]` section.
    OpenAI,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingBackend,
    pub dimension: usize,
    pub model: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ExplainSettings {
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// USD per million prompt tokens.
    pub input_price_per_million: f64,
    /// USD per million completion tokens.
    pub output_price_per_million: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InvoiceSettings {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TrelloSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub board_id: String,
}

impl Settings {
    /// Loads the settings from every source.
    pub fn load() -> Result<Self> {
        let file = match env::var("TERTULIA_CONFIG") {
            Ok(path) => {
                info!("reading settings from `{path}`");
                File::with_name(&path).required(true)
            }
            Err(_) => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };
        let builder = defaults()
            .add_source(file)
            .add_source(
                Environment::with_prefix("TERTULIA")
                    .separator("__")
                    .try_parsing(true),
            );
        let builder = with_conventional_vars(builder, |name| env::var(name).ok())?;
        Self::finish(builder)
    }

    /// Loads the built-in defaults overlaid with `toml`.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::finish(defaults().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder
            .build()
            .context("failed to read settings")?
            .try_deserialize::<Settings>()
            .context("invalid settings")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.gemini.api_key.trim().is_empty(),
            "missing Gemini API key, set GEMINI_API_KEY"
        );
        ensure!(
            !self.openai.api_key.trim().is_empty(),
            "missing OpenAI API key, set OPENAI_API_KEY"
        );
        ensure!(
            self.assistant.max_sessions > 0,
            "assistant.max_sessions must be positive"
        );
        ensure!(self.rag.chunk_size > 0, "rag.chunk_size must be positive");
        ensure!(
            self.rag.embedding.dimension > 0,
            "rag.embedding.dimension must be positive"
        );
        if self.trello.api_key.is_empty() || self.trello.token.is_empty() {
            warn!("Trello credentials are not set, the board tools will fail");
        }
        Ok(())
    }
}

fn defaults() -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml))
}

fn with_conventional_vars(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigBuilder<DefaultState>> {
    for (var, key) in CONVENTIONAL_VARS {
        let value = lookup(var).filter(|value| !value.is_empty());
        builder = builder.set_override_option(key, value)?;
    }
    Ok(builder)
}
