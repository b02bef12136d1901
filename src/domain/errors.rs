use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    EmptyInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("{format} parse error: {message}")]
    Extraction { format: String, message: String },

    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    #[error("LLM service error: {0}")]
    LlmService(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn unsupported_file_type(ext: impl Into<String>) -> Self {
        Self::UnsupportedFileType(ext.into())
    }

    pub fn extraction(format: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            format: format.into(),
            message: msg.into(),
        }
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingService(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::LlmService(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::UpstreamTimeout(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors caused by the caller's input rather than by an upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput(_)
                | Self::UnsupportedFileType(_)
                | Self::Extraction { .. }
                | Self::Validation(_)
        )
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingService(_) | Self::LlmService(_) | Self::UpstreamTimeout(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
