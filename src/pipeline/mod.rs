//! Real-time speech pipeline.
//!
//! Implements a multi-stage pipeline where each stage runs in its own thread,
//! connected by bounded crossbeam channels for backpressure. Two shared
//! signals coordinate the stages with the telephony bridge: `should_listen`
//! gates capture while the agent is speaking, and `stop` requests a uniform
//! shutdown.

pub mod chunker;
pub mod llm_stage;
pub mod orchestrator;
pub mod signals;
pub mod stage;
pub mod stt_stage;
pub mod tts_stage;
pub mod types;
pub mod vad_stage;

pub use chunker::SpeechChunker;
pub use llm_stage::LlmStage;
pub use orchestrator::{Pipeline, PipelineConfig, PipelineHandle, PipelineRun};
pub use signals::PipelineSignals;
pub use stage::{Stage, StageError, StageRunner, StageState};
pub use stt_stage::SttStage;
pub use tts_stage::TtsStage;
pub use types::{AudioFrame, Utterance};
pub use vad_stage::VadStage;
