use std::fmt::{self, Display};

/// The kind of error that occurred while talking to a provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote endpoint could not be reached, or the connection broke
    /// while reading the response.
    Network,
    /// The provider answered with a non-success status.
    Status,
    /// The provider is rate limited.
    RateLimitExceeded,
    /// The response body could not be understood.
    MalformedResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Status => write!(f, "unexpected status"),
            ErrorKind::RateLimitExceeded => write!(f, "rate limit exceeded"),
            ErrorKind::MalformedResponse => write!(f, "malformed response"),
            ErrorKind::Other => write!(f, "other error"),
        }
    }
}
