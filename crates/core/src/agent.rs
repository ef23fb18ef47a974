mod builder;
mod error;
mod state;

use tertulia_model::{ModelMessage, TokenUsage};
use tokio::sync::oneshot;

use crate::actor::Actor;
pub use builder::AgentBuilder;
pub use error::AgentError;
use state::{AgentState, EnqueueUserInput, SnapshotMessages};

/// The final answer of one chat turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentReply {
    /// The assistant's text.
    pub text: String,
    /// Tokens consumed by every model request of the turn.
    pub usage: TokenUsage,
}

/// An agent instance, which owns a conversation memory, a model client and
/// the shared tool registry.
///
/// The agent runs as an actor: inputs are queued in its mailbox and handled
/// one turn at a time in arrival order, so the memory is never touched by
/// two requests at once. Cloning an `Agent` yields another handle to the
/// same actor.
#[derive(Clone)]
pub struct Agent {
    actor: Actor<AgentState>,
}

impl Agent {
    /// Sends a user input and waits for the final answer.
    #[inline]
    pub async fn chat<S: Into<String>>(
        &self,
        input: S,
    ) -> Result<AgentReply, AgentError> {
        self.chat_with_context(input, None).await
    }

    /// Like [`Agent::chat`], with extra system context for this turn only.
    ///
    /// The context is shown to the model right after the pinned system
    /// message, but it is not stored in the memory.
    pub async fn chat_with_context<S: Into<String>>(
        &self,
        input: S,
        context: Option<String>,
    ) -> Result<AgentReply, AgentError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.actor
            .send(EnqueueUserInput {
                input: input.into(),
                context,
                reply_tx,
            })
            .map_err(|_| AgentError::Closed)?;
        reply_rx.await.map_err(|_| AgentError::Closed)?
    }

    /// Returns a snapshot of the messages in memory.
    pub async fn messages(&self) -> Result<Vec<ModelMessage>, AgentError> {
        let (tx, rx) = oneshot::channel();
        self.actor
            .send(SnapshotMessages(tx))
            .map_err(|_| AgentError::Closed)?;
        rx.await.map_err(|_| AgentError::Closed)
    }

    fn spawn_from_builder(builder: AgentBuilder) -> Self {
        let state = AgentState::new(builder);
        Self {
            actor: Actor::spawn(state, "agent"),
        }
    }
}
