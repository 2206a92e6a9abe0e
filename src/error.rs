//! Custom error types for quizzer

use thiserror::Error;

/// Main error type for quizzer operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Document too large: {len} characters (limit {max})")]
    SizeLimitExceeded { len: usize, max: usize },

    #[error("Document contains no text")]
    EmptyDocument,

    #[error("Quiz generation failed: {0}")]
    GenerationParse(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Result already recorded: {0}")]
    DuplicateResult(String),

    #[error("Quiz id already in use: {0}")]
    DuplicateQuiz(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("An answer is required before verifying")]
    EmptyAnswer,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'quizzer init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for quizzer
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}
