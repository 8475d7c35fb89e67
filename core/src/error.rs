//! Engine error types.

use thiserror::Error;

/// Errors that abort the current render.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed chunk, unexpected tag or missing required block.
    #[error("decode error: {0}")]
    Decode(String),

    /// A named entity was referenced before its definition.
    #[error("reference error: {0}")]
    Reference(String),

    /// A required setting is missing or carries the wrong type.
    #[error("setting '{key}' {problem}")]
    Config {
        /// The setting key.
        key: String,
        /// What went wrong with it.
        problem: String,
    },

    /// File system failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV read or write failure.
    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;
