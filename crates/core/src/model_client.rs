use std::error::Error;
use std::fmt::{self, Display};
use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use tertulia_model::{
    AssistantMessage, ErrorKind, ModelFinishReason, ModelMessage,
    ModelParameters, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, TokenUsage, ToolCallRequest,
};
use tracing::Instrument;

type SendRequestResult = Result<ModelClientResponse, ModelClientError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that carries the default generation
/// parameters and provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    defaults: Arc<ModelParameters>,
}

impl ModelClient {
    /// Creates a client with no default parameters.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(debug_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            defaults: Default::default(),
        }
    }

    /// Sets the parameters that every request falls back to.
    #[inline]
    pub fn with_defaults(mut self, defaults: ModelParameters) -> Self {
        self.defaults = Arc::new(defaults);
        self
    }

    /// Returns the default parameters.
    #[inline]
    pub fn defaults(&self) -> &ModelParameters {
        &self.defaults
    }

    /// Sends a request and waits for the complete response.
    ///
    /// Parameters set in the request override the defaults field by field.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn send_request(&self, mut req: ModelRequest) -> SendRequestResult {
        req.parameters = req.parameters.merged_over(&self.defaults);
        (self.handler_fn)(req).await
    }

    /// Sends a single-turn request without tools.
    #[inline]
    pub async fn chat(
        &self,
        messages: Vec<ModelMessage>,
        parameters: ModelParameters,
    ) -> SendRequestResult {
        self.send_request(ModelRequest {
            messages,
            tools: vec![],
            parameters,
        })
        .await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelClientResponse {
    /// The generated text.
    pub text: String,
    /// Tool calls requested by the model, in the order they were listed.
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage of this response, zero if the provider didn't report it.
    pub usage: TokenUsage,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelClientResponse {
    /// Returns `true` if the model asked for tool calls.
    #[inline]
    pub fn wants_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Converts this response into the assistant message for the
    /// conversation.
    #[inline]
    pub fn to_message(&self) -> ModelMessage {
        ModelMessage::Assistant(AssistantMessage {
            content: self.text.clone(),
            tool_calls: self.tool_calls.clone(),
        })
    }
}

/// The remote call couldn't complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelClientError {
    kind: ErrorKind,
    message: String,
}

impl ModelClientError {
    fn from_provider<E: ModelProviderError>(err: E) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub(crate) fn task_failed() -> Self {
        Self {
            kind: ErrorKind::Other,
            message: "the request task panicked".to_owned(),
        }
    }

    /// Returns the kind reported by the provider.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ModelClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model request failed: {}", self.message)
    }
}

impl Error for ModelClientError {}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err}");
            return Err(ModelClientError::from_provider(err));
        }
    };

    let mut result = ModelClientResponse::default();

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err}");
                return Err(ModelClientError::from_provider(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                result.text.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                result.tool_calls.push(req);
            }
            ModelResponseEvent::Usage(usage) => {
                result.usage += usage;
            }
            ModelResponseEvent::Completed(reason) => {
                result.finish_reason = Some(reason);
            }
        }
    }

    debug!(
        "finished a request, {} input and {} output tokens",
        result.usage.input_tokens, result.usage.output_tokens
    );
    Ok(result)
}
