//! Caller-facing error taxonomy

use transport::TransportError;

/// Normalized failure of a call made through `SessionClient`.
///
/// `execute` only ever produces `Network`, `Auth` or `Server`. `Decode` comes
/// from the typed JSON helpers when a successful body does not match the
/// requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No response was received (connection failure, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// 401 from the renewal call itself, or any 403
    #[error("authentication error: {0}")]
    Auth(String),

    /// Any other non-2xx status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("response decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Network(_) => "network",
            Error::Auth(_) => "auth",
            Error::Server { .. } => "server",
            Error::Decode(_) => "decode",
        }
    }

    /// HTTP status behind the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::Network(err.to_string())
    }
}

/// Result alias for session client operations.
pub type Result<T> = std::result::Result<T, Error>;
