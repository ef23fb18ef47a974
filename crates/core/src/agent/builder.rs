use std::sync::Arc;

use tertulia_model::{ModelParameters, ModelProvider};

use super::Agent;
use crate::model_client::ModelClient;
use crate::tool::ToolRegistry;

const DEFAULT_MEMORY_CAPACITY: usize = 20;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) system_prompt: Option<String>,
    pub(crate) memory_capacity: usize,
    pub(crate) tools: Arc<ToolRegistry>,
    pub(crate) max_tool_rounds: usize,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder sharing an existing model client.
    #[inline]
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            system_prompt: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            tools: Default::default(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    /// Sets the default generation parameters of the model client.
    #[inline]
    pub fn model_parameters(mut self, parameters: ModelParameters) -> Self {
        self.model_client = self.model_client.with_defaults(parameters);
        self
    }

    /// Sets the pinned system message.
    #[inline]
    pub fn system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets how many messages the memory retains.
    #[inline]
    pub fn memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// Offers the tools of `registry` to the model.
    #[inline]
    pub fn tools(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tools = registry;
        self
    }

    /// Sets how many consecutive tool rounds a turn may take.
    #[inline]
    pub fn max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Builds the agent.
    ///
    /// Must be called within a Tokio runtime.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::spawn_from_builder(self)
    }
}
