//! An abstraction layer for different chat-completion and embedding
//! providers.
//!
//! This crate establishes an unified protocol for the services to interact
//! with the supported remote models, so that an endpoint can switch between
//! providers (or a scripted fake in tests) without touching its own logic.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod embedding;
mod error;
mod provider;
mod request;
mod response;

pub use embedding::*;
pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
