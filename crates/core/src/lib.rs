//! Core logic including the agent loop, conversation memory, tool dispatch
//! and retrieval.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod actor;
mod agent;
pub mod conversation;
mod model_client;
pub mod retrieval;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentError, AgentReply};
pub use model_client::{ModelClient, ModelClientError, ModelClientResponse};
