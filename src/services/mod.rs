//! External speech collaborators.
//!
//! The recognition, generation, and synthesis stages call remote services.
//! Each is modeled as a blocking trait (stages run in plain threads), with
//! an HTTP implementation and a mock for tests.

pub mod llm;
pub mod stt;
pub mod tts;

use crate::error::{BridgeError, Result};
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use llm::OpenAiGenerator;
pub use stt::ScribeRecognizer;
pub use tts::ElevenLabsSynthesizer;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of the running conversation.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for speech-to-text recognition.
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribes audio samples (16-bit PCM at 16 kHz mono) to text.
    fn transcribe(&self, audio: &[i16]) -> Result<String>;
}

/// Trait for conversational response generation.
pub trait ResponseGenerator: Send + Sync {
    /// Generates the next assistant reply for the given conversation.
    fn generate(&self, history: &[ChatTurn]) -> Result<String>;
}

/// Trait for speech synthesis.
///
/// Returns the synthesized speech as a byte reader of 16-bit little-endian
/// PCM at 16 kHz; implementations may stream incrementally or hand back a
/// complete buffer.
pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, text: &str) -> Result<Box<dyn Read + Send>>;
}

/// Mock recognizer for testing.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    response: String,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            response: "mock transcription".to_string(),
            should_fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a specific transcript.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of transcribe calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn transcribe(&self, _audio: &[i16]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            Err(BridgeError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }
}

/// Mock generator for testing; replies are consumed in order, repeating the
/// last one when exhausted.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    replies: Arc<Mutex<Vec<String>>>,
    fallback: String,
    should_fail: bool,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            fallback: "mock reply".to_string(),
            should_fail: false,
        }
    }

    /// Queue a reply; replies are returned in the order they were added.
    pub fn with_reply(self, reply: &str) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reply.to_string());
        self
    }

    /// Configure the mock to fail on generate.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGenerator for MockGenerator {
    fn generate(&self, _history: &[ChatTurn]) -> Result<String> {
        if self.should_fail {
            return Err(BridgeError::Generation {
                message: "mock generation failure".to_string(),
            });
        }
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        if replies.is_empty() {
            Ok(self.fallback.clone())
        } else {
            Ok(replies.remove(0))
        }
    }
}

/// Mock synthesizer for testing; records every text it is asked to speak.
#[derive(Debug, Clone)]
pub struct MockSynthesizer {
    audio: Vec<u8>,
    should_fail: bool,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            audio: Vec::new(),
            should_fail: false,
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Configure the PCM bytes returned for every synthesis call.
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    /// Configure the mock to fail on synthesize.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Texts synthesized so far.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Box<dyn Read + Send>> {
        if self.should_fail {
            return Err(BridgeError::Synthesis {
                message: "mock synthesis failure".to_string(),
            });
        }
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(Box::new(Cursor::new(self.audio.clone())))
    }
}
