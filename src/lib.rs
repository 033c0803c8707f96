//! voicebridge - bridges carrier phone calls to a real-time speech pipeline
//!
//! Call audio arrives over the carrier's media-stream WebSocket as 8 kHz
//! mu-law, is converted to 16 kHz PCM and fed through a chain of stages
//! (voice-activity detection → speech-to-text → language generation →
//! speech synthesis), and the synthesized reply is relayed back to the
//! caller.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod assessment;
pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod telephony;

// Core collaborator traits (audio in → text → text → audio out)
pub use services::{ResponseGenerator, SpeechRecognizer, SpeechSynthesizer};

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, PipelineRun, PipelineSignals};

// Telephony bridge
pub use telephony::{AppState, CarrierApi, create_router};

// Error handling
pub use error::{BridgeError, Result};

// Config
pub use config::Config;

// Stage framework (for advanced users)
pub use pipeline::{Stage, StageError, StageRunner};

/// Build version string with optional git commit hash.
///
/// Returns `"0.2.0+abc1234"` when git hash is available, `"0.2.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
