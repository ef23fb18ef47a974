//! Retrieval-augmented generation support.
//!
//! A document is split into fixed-size segments, every segment is embedded
//! and kept in an in-memory store, and queries are answered with the most
//! similar segments.

mod embedder;
mod error;
mod hashing;
mod retriever;
mod splitter;
mod store;

pub use embedder::Embedder;
pub use error::RetrievalError;
pub use hashing::HashingEmbeddingProvider;
pub use retriever::Retriever;
pub use splitter::{DocumentSplitter, TextSegment};
pub use store::{EmbeddingStore, ScoredSegment, cosine_similarity, relevance_score};
