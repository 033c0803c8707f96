//! Error types for voicebridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio codec errors
    #[error("Audio conversion failed: {message}")]
    Codec { message: String },

    // Carrier errors
    #[error("Call initiation failed: {message}")]
    CallInitiation { message: String },

    #[error("Carrier API error: {message}")]
    Carrier { message: String },

    #[error("Media protocol error: {message}")]
    MediaProtocol { message: String },

    // Collaborator errors
    #[error("Speech recognition failed: {message}")]
    Transcription { message: String },

    #[error("Response generation failed: {message}")]
    Generation { message: String },

    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Assessment handling failed: {message}")]
    Assessment { message: String },

    // Transport and encoding errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BridgeError>;
