//! Error types for vidrag.

use thiserror::Error;

/// Library-level error type for vidrag operations.
#[derive(Error, Debug)]
pub enum VidragError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No transcript available: {0}")]
    Acquisition(String),

    #[error("Indexing failed after {embedded} chunks were embedded: {message}")]
    Indexing { embedded: usize, message: String },

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VidragError {
    /// Wrap a provider error raised while writing to the knowledge base.
    pub fn indexing(embedded: usize, source: impl std::fmt::Display) -> Self {
        VidragError::Indexing {
            embedded,
            message: source.to_string(),
        }
    }
}

/// Result type alias for vidrag operations.
pub type Result<T> = std::result::Result<T, VidragError>;
