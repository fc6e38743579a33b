//! Error types for the document-QA pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Document-QA pipeline errors
///
/// Every whole-request failure maps to one of these variants so the caller
/// can render a precise message. Stage-local partial failures (a single page
/// failing OCR, one file in a batch failing to parse) are absorbed and
/// logged instead of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document unreadable or no extractable content
    #[error("Failed to extract text from '{file}': {message}")]
    Extraction { file: String, message: String },

    /// Embedding model failed to load or a call failed after retries
    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A well-formed request produced zero indexable segments
    #[error("No indexable content was produced from the supplied documents")]
    NoContent,

    /// The generative model call itself failed
    #[error("Answer generation failed: {0}")]
    AnswerGeneration(String),

    /// Cooperative cancellation was requested
    #[error("Operation was cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create an embedding-unavailable error
    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(message.into())
    }

    /// Create an answer generation error
    pub fn answer_generation(message: impl Into<String>) -> Self {
        Self::AnswerGeneration(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
