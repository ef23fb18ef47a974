//! An HTTP front for a tool-using assistant, a document-grounded assistant
//! and two single-shot model endpoints.
//!
//! The binary wires everything from [`config::Settings`]. Tests assemble
//! [`state::AppState`] from scripted backends instead.

#[macro_use]
extern crate tracing;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod tools;
pub mod trello;

pub use routes::router;
pub use state::{AppState, Backends};
