use std::error::Error;
use std::fmt::{self, Display};

use crate::model_client::ModelClientError;

/// An error that ended a chat turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentError {
    /// The model request failed.
    Model(ModelClientError),
    /// The model kept asking for tools beyond the allowed number of rounds.
    ToolLoopExceeded(usize),
    /// The agent has stopped.
    Closed,
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Model(err) => write!(f, "{err}"),
            AgentError::ToolLoopExceeded(rounds) => {
                write!(f, "no final answer after {rounds} tool rounds")
            }
            AgentError::Closed => write!(f, "the agent has stopped"),
        }
    }
}

impl Error for AgentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AgentError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelClientError> for AgentError {
    #[inline]
    fn from(err: ModelClientError) -> Self {
        AgentError::Model(err)
    }
}
