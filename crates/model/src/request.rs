use serde_json::Value;

use crate::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
    /// Generation parameters for this request.
    pub parameters: ModelParameters,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// A message generated by the model.
    Assistant(AssistantMessage),
    /// A tool call result.
    Tool(ToolCallResult),
}

impl ModelMessage {
    /// Creates an assistant message that only carries text.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::Assistant(AssistantMessage {
            content: content.into(),
            tool_calls: vec![],
        })
    }

    /// Returns the text content of the message.
    pub fn text(&self) -> &str {
        match self {
            ModelMessage::System(text) | ModelMessage::User(text) => text,
            ModelMessage::Assistant(msg) => &msg.content,
            ModelMessage::Tool(result) => &result.content,
        }
    }

    /// Returns `true` if this is an assistant message that requested tool
    /// calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        matches!(self, ModelMessage::Assistant(msg) if !msg.tool_calls.is_empty())
    }
}

/// A message generated by the model, possibly requesting tool calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AssistantMessage {
    /// The generated text. May be empty when the model only calls tools.
    pub content: String,
    /// Tool calls requested in this message, in the order the model listed
    /// them.
    pub tool_calls: Vec<ToolCallRequest>,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool that was called.
    pub name: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}

/// Generation parameters.
///
/// Every field is optional, an unset field means "use whatever the next
/// level decides". See [`ModelParameters::merged_over`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelParameters {
    /// The model to sample from.
    pub model_name: Option<String>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Upper bound of generated tokens.
    pub max_output_tokens: Option<u32>,
}

impl ModelParameters {
    /// Sets the model name.
    #[inline]
    pub fn with_model_name<S: Into<String>>(mut self, model_name: S) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Sets the temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the upper bound of generated tokens.
    #[inline]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Merges `self` over `defaults` field by field. Fields set in `self`
    /// win, unset fields are taken from `defaults`.
    pub fn merged_over(&self, defaults: &ModelParameters) -> ModelParameters {
        ModelParameters {
            model_name: self
                .model_name
                .clone()
                .or_else(|| defaults.model_name.clone()),
            temperature: self.temperature.or(defaults.temperature),
            max_output_tokens: self
                .max_output_tokens
                .or(defaults.max_output_tokens),
        }
    }
}
