/// Chunkflow error types
#[derive(Debug, thiserror::Error)]
pub enum ChunkflowError {
    /// Invalid settings, detected before any remote call
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Network-level failure reaching the model endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request throttled by the provider
    #[error("Rate limit error: {0}")]
    RateLimit(String),

    /// Provider-side rejection or malformed model response
    #[error("Model error: {0}")]
    Model(String),

    /// Chunking failure
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Processing cancelled by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChunkflowError {
    /// Create invalid configuration error
    pub fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create transport error
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Self::Transport(msg.into())
    }

    /// Create rate limit error
    pub fn rate_limit<S: Into<String>>(msg: S) -> Self {
        Self::RateLimit(msg.into())
    }

    /// Create model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create chunking error
    pub fn chunking<S: Into<String>>(msg: S) -> Self {
        Self::Chunking(msg.into())
    }

    /// Create cancelled error
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::Cancelled(msg.into())
    }
}

impl ChunkflowError {
    /// Stable machine-readable error kind, used in serialized outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "invalid_configuration",
            Self::Transport(_) => "transport",
            Self::RateLimit(_) => "rate_limit",
            Self::Model(_) => "model",
            Self::Chunking(_) => "chunking",
            Self::Cancelled(_) => "cancelled",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }

    /// Whether the failure is worth retrying at the transport level
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(ChunkflowError::transport("down").kind(), "transport");
        assert_eq!(ChunkflowError::rate_limit("429").kind(), "rate_limit");
        assert_eq!(ChunkflowError::model("bad").kind(), "model");
        assert_eq!(
            ChunkflowError::invalid_configuration("bad ratio").kind(),
            "invalid_configuration"
        );
        assert_eq!(ChunkflowError::cancelled("stop").kind(), "cancelled");
    }

    #[test]
    fn test_is_retryable() {
        assert!(ChunkflowError::transport("down").is_retryable());
        assert!(ChunkflowError::rate_limit("429").is_retryable());
        assert!(!ChunkflowError::model("rejected").is_retryable());
        assert!(!ChunkflowError::invalid_configuration("bad").is_retryable());
    }
}
