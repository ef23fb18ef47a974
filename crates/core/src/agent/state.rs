use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::sync::Arc;

use tertulia_model::{
    ModelMessage, ModelRequest, TokenUsage, ToolCallRequest, ToolCallResult,
};
use tokio::sync::oneshot;

use super::{AgentBuilder, AgentError, AgentReply};
use crate::actor::{Actor, Message};
use crate::conversation::Conversation;
use crate::model_client::{ModelClient, ModelClientError, ModelClientResponse};
use crate::tool::ToolRegistry;

type ReplySender = oneshot::Sender<Result<AgentReply, AgentError>>;

pub struct AgentState {
    model_client: ModelClient,
    tools: Arc<ToolRegistry>,
    conversation: Conversation,
    max_tool_rounds: usize,
    // `None` while idle.
    current_turn: Option<Turn>,
    pending_inputs: VecDeque<EnqueueUserInput>,
}

struct Turn {
    reply_tx: ReplySender,
    context: Option<String>,
    usage: TokenUsage,
    tool_rounds: usize,
    // One slot per requested call, filled as the tools finish.
    tool_results: Vec<Option<ToolCallResult>>,
}

impl AgentState {
    pub fn new(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            system_prompt,
            memory_capacity,
            tools,
            max_tool_rounds,
        } = builder;

        let mut conversation = Conversation::with_capacity(memory_capacity);
        if let Some(prompt) = system_prompt {
            conversation.append(ModelMessage::System(prompt));
        }
        Self {
            model_client,
            tools,
            conversation,
            max_tool_rounds,
            current_turn: None,
            pending_inputs: Default::default(),
        }
    }

    fn process_next_input(&mut self, handle: &Actor<Self>) {
        if self.current_turn.is_some() {
            // The running turn calls back here when it ends.
            return;
        }
        let Some(next) = self.pending_inputs.pop_front() else {
            trace!("idle");
            return;
        };
        if next.reply_tx.is_closed() {
            debug!("caller has gone, skip the input");
            self.process_next_input(handle);
            return;
        }

        self.conversation.append(ModelMessage::User(next.input));
        self.current_turn = Some(Turn {
            reply_tx: next.reply_tx,
            context: next.context,
            usage: TokenUsage::default(),
            tool_rounds: 0,
            tool_results: vec![],
        });
        self.send_model_request(handle);
    }

    fn build_model_request(&self) -> ModelRequest {
        let mut messages = self.conversation.messages();
        let context = self
            .current_turn
            .as_ref()
            .and_then(|turn| turn.context.clone());
        if let Some(context) = context {
            // Right after the pinned system message, if there is one.
            let at = usize::from(self.conversation.system().is_some());
            messages.insert(at, ModelMessage::System(context));
        }
        ModelRequest {
            messages,
            tools: self.tools.definitions(),
            parameters: Default::default(),
        }
    }

    fn send_model_request(&mut self, handle: &Actor<Self>) {
        let request = self.build_model_request();
        let model_client = self.model_client.clone();
        let handle = handle.clone();
        let task = tokio::spawn(async move { model_client.send_request(request).await });
        tokio::spawn(async move {
            let response = task.await.unwrap_or_else(|err| {
                error!("model request task failed: {err}");
                Err(ModelClientError::task_failed())
            });
            handle.send(ModelRequestFinished(response)).ok();
        });
    }

    fn handle_model_response(
        &mut self,
        response: Result<ModelClientResponse, ModelClientError>,
        handle: &Actor<Self>,
    ) {
        let Some(turn) = self.current_turn.as_mut() else {
            warn!("got a model response without a running turn");
            return;
        };
        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                self.finish_turn(Err(err.into()), handle);
                return;
            }
        };
        turn.usage += resp.usage;

        if !resp.wants_tool_calls() {
            self.conversation.append(resp.to_message());
            let reply = AgentReply {
                text: resp.text,
                usage: turn.usage,
            };
            self.finish_turn(Ok(reply), handle);
            return;
        }

        if turn.tool_rounds >= self.max_tool_rounds {
            warn!("giving up after {} tool rounds", turn.tool_rounds);
            let rounds = turn.tool_rounds;
            self.finish_turn(Err(AgentError::ToolLoopExceeded(rounds)), handle);
            return;
        }
        turn.tool_rounds += 1;
        turn.tool_results = vec![None; resp.tool_calls.len()];

        self.conversation.append(resp.to_message());
        for (slot, req) in resp.tool_calls.into_iter().enumerate() {
            self.spawn_tool(slot, req, handle);
        }
    }

    fn spawn_tool(&self, slot: usize, req: ToolCallRequest, handle: &Actor<Self>) {
        debug!("calling tool `{}` ({})", req.name, req.id);
        let (id, name) = (req.id.clone(), req.name.clone());
        let task = tokio::spawn(self.tools.execute(req));
        let handle = handle.clone();
        // A panicking tool still has to fill its slot, or the turn never ends.
        tokio::spawn(async move {
            let result = task.await.unwrap_or_else(|err| {
                error!("tool `{name}` task failed: {err}");
                ToolCallResult {
                    id,
                    name,
                    content: "Error: tool panicked".to_owned(),
                }
            });
            handle.send(ToolFinished { slot, result }).ok();
        });
    }

    fn handle_tool_result(
        &mut self,
        slot: usize,
        result: ToolCallResult,
        handle: &Actor<Self>,
    ) {
        let Some(turn) = self.current_turn.as_mut() else {
            warn!("got a tool result without a running turn");
            return;
        };
        let Some(entry) = turn.tool_results.get_mut(slot) else {
            warn!("got a tool result for an unknown slot {slot}");
            return;
        };
        *entry = Some(result);
        if turn.tool_results.iter().any(Option::is_none) {
            return;
        }

        // Every call of the round finished, feed the results back in the
        // order the model requested them.
        for result in turn.tool_results.drain(..).flatten() {
            self.conversation.append(ModelMessage::Tool(result));
        }
        self.send_model_request(handle);
    }

    fn finish_turn(
        &mut self,
        result: Result<AgentReply, AgentError>,
        handle: &Actor<Self>,
    ) {
        if let Err(err) = &result {
            error!("turn failed: {err}");
        }
        if let Some(turn) = self.current_turn.take() {
            turn.reply_tx.send(result).ok();
        }
        self.process_next_input(handle);
    }
}

pub struct EnqueueUserInput {
    pub input: String,
    pub context: Option<String>,
    pub reply_tx: ReplySender,
}

impl Debug for EnqueueUserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnqueueUserInput")
            .field("input", &self.input)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Message<AgentState> for EnqueueUserInput {
    fn handle(self: Box<Self>, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.pending_inputs.push_back(*self);
        state.process_next_input(handle);
    }
}

#[derive(Debug)]
pub struct SnapshotMessages(pub oneshot::Sender<Vec<ModelMessage>>);

impl Message<AgentState> for SnapshotMessages {
    fn handle(self: Box<Self>, state: &mut AgentState, _: &Actor<AgentState>) {
        self.0.send(state.conversation.messages()).ok();
    }
}

#[derive(Debug)]
struct ModelRequestFinished(Result<ModelClientResponse, ModelClientError>);

impl Message<AgentState> for ModelRequestFinished {
    fn handle(self: Box<Self>, state: &mut AgentState, handle: &Actor<AgentState>) {
        state.handle_model_response(self.0, handle);
    }
}

#[derive(Debug)]
struct ToolFinished {
    slot: usize,
    result: ToolCallResult,
}

impl Message<AgentState> for ToolFinished {
    fn handle(self: Box<Self>, state: &mut AgentState, handle: &Actor<AgentState>) {
        let ToolFinished { slot, result } = *self;
        state.handle_tool_result(slot, result, handle);
    }
}
