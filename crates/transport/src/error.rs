//! Error types for transport operations

/// Errors from issuing a request. Every variant means no HTTP response was
/// received; responses with error statuses are not errors at this layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid transport configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// Classify a reqwest error by what went wrong on the wire.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        assert_eq!(
            TransportError::Timeout("after 10s".into()).to_string(),
            "request timed out: after 10s"
        );
        assert!(
            TransportError::Connect("refused".into())
                .to_string()
                .contains("refused")
        );
    }
}
