use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use tertulia_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    TokenUsage, ToolCallRequest,
};

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{ChatCompletionChunk, ToolCall};

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Tool calls are only complete once the choice finishes, their arguments
    // arrive in fragments.
    tool_calls: Vec<ToolCall>,
    // Events decoded from the stream but not yet handed out. One chunk may
    // produce several of them.
    pending_events: VecDeque<ModelResponseEvent>,
    completed: bool,
    stream_ended: bool,
}

impl PartialState {
    fn merge_tool_call(&mut self, tool_call: ToolCall) {
        let target = match tool_call.index {
            Some(index) => self
                .tool_calls
                .iter()
                .position(|t| t.index == Some(index)),
            // Without an index, an id marks the start of a new call and
            // anything else continues the latest one.
            None if tool_call.id.as_deref().is_some_and(|id| !id.is_empty()) => {
                None
            }
            None => self.tool_calls.len().checked_sub(1),
        };
        let Some(partial_tool_call) =
            target.and_then(|idx| self.tool_calls.get_mut(idx))
        else {
            self.tool_calls.push(tool_call);
            return;
        };

        // Patch the partial tool call.
        if let Some(id) = tool_call.id {
            partial_tool_call.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = tool_call.r#type {
            partial_tool_call.r#type = Some(ty);
        }
        if let Some(function) = tool_call.function {
            match partial_tool_call.function {
                Some(ref mut partial_func) => {
                    if let Some(name) = function.name {
                        partial_func
                            .name
                            .get_or_insert_default()
                            .push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial_func
                            .arguments
                            .get_or_insert_default()
                            .push_str(&arguments);
                    }
                }
                None => partial_tool_call.function = Some(function),
            }
        }
    }

    /// Queues the accumulated tool calls followed by the completion event.
    fn complete(&mut self, finish_reason: Option<ModelFinishReason>) {
        if self.completed {
            return;
        }
        self.completed = true;

        let has_tool_calls = !self.tool_calls.is_empty();
        for tool_call in self.tool_calls.drain(..) {
            self.pending_events
                .push_back(ModelResponseEvent::ToolCall(finish_tool_call(
                    tool_call,
                )));
        }
        let finish_reason = finish_reason.unwrap_or(if has_tool_calls {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        });
        self.pending_events
            .push_back(ModelResponseEvent::Completed(finish_reason));
    }
}

fn finish_tool_call(tool_call: ToolCall) -> ToolCallRequest {
    let (name, arguments) = match tool_call.function {
        Some(function) => (
            function.name.unwrap_or_default(),
            function.arguments.unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    };
    let arguments = if arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        // Keep the raw text around so the tool layer can report it.
        serde_json::from_str::<Value>(&arguments)
            .unwrap_or(Value::String(arguments))
    };
    ToolCallRequest {
        id: tool_call.id.unwrap_or_default(),
        name,
        arguments,
    }
}

fn parse_finish_reason(reason: &str) -> ModelFinishReason {
    match reason {
        "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
        "length" => ModelFinishReason::Length,
        _ => ModelFinishReason::Stop,
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_events: Default::default(),
            completed: false,
            stream_ended: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        if let Some(event) = partial_state.pending_events.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.stream_ended {
            return Ok((None, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(event) => event,
            Err(SseError::ChunksError(err)) => {
                return Err(Error::new(err.0, ErrorKind::Network));
            }
            Err(SseError::InvalidPayload) => {
                return Err(Error::new(
                    "invalid event stream payload",
                    ErrorKind::MalformedResponse,
                ));
            }
        };
        let Some(sse_event) = sse_event.filter(|event| event != "[DONE]") else {
            partial_state.stream_ended = true;
            // Some servers close the stream without a finish reason.
            partial_state.complete(None);
            continue;
        };
        trace!("got sse event: {sse_event}");

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::MalformedResponse)
            })?;
        if !chunk.id.is_empty() {
            let id = partial_state.id.get_or_insert_with(|| chunk.id.clone());
            if *id != chunk.id {
                return Err(Error::new(
                    "chunk id mismatch",
                    ErrorKind::MalformedResponse,
                ));
            }
        }

        // Only a single choice is ever requested.
        if let Some(choice) = chunk.choices.into_iter().next() {
            // A chunk may carry both the last delta and the finish reason,
            // so the delta goes first.
            if let Some(content) =
                choice.delta.content.filter(|content| !content.is_empty())
            {
                partial_state
                    .pending_events
                    .push_back(ModelResponseEvent::MessageDelta(content));
            }
            for tool_call in choice.delta.tool_calls.unwrap_or_default() {
                partial_state.merge_tool_call(tool_call);
            }
            if let Some(finish_reason) = choice.finish_reason {
                partial_state.complete(Some(parse_finish_reason(&finish_reason)));
            }
        }

        if let Some(usage) = chunk.usage {
            partial_state.pending_events.push_back(ModelResponseEvent::Usage(
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ));
        }
    }
}
