use std::error::Error;
use std::fmt::{self, Display};

use tertulia_model::ErrorKind;

/// An error from the retrieval layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetrievalError {
    /// The embedding provider failed.
    Embedding {
        /// The kind reported by the provider.
        kind: ErrorKind,
        /// The error message.
        message: String,
    },
    /// The provider returned a vector of an unexpected size, or a wrong
    /// number of vectors.
    UnexpectedShape(String),
}

impl Display for RetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalError::Embedding { message, .. } => {
                write!(f, "embedding failed: {message}")
            }
            RetrievalError::UnexpectedShape(message) => {
                write!(f, "unexpected embeddings: {message}")
            }
        }
    }
}

impl Error for RetrievalError {}
