//! Voice-activity stage.
//!
//! Consumes captured audio frames, gates them on the `should_listen` signal,
//! and accumulates speech into complete utterances. When an utterance is
//! handed downstream the listening gate is cleared so the agent's own reply
//! is not captured back into the pipeline.

use crate::audio::vad::{Vad, VadConfig, VadEvent};
use crate::defaults;
use crate::pipeline::signals::PipelineSignals;
use crate::pipeline::stage::{Stage, StageError};
use crate::pipeline::types::{AudioFrame, Utterance};
use std::sync::Arc;

/// Stage that segments captured audio into spoken utterances.
pub struct VadStage {
    vad: Vad,
    signals: Arc<PipelineSignals>,
    buffer: Vec<i16>,
    sequence: u64,
    max_utterance_samples: usize,
}

impl VadStage {
    /// Creates a VAD stage with the given detector configuration.
    pub fn new(config: VadConfig, signals: Arc<PipelineSignals>) -> Self {
        let max_utterance_samples =
            (config.sample_rate as u64 * defaults::MAX_UTTERANCE_MS as u64 / 1000) as usize;
        Self {
            vad: Vad::new(config),
            signals,
            buffer: Vec::new(),
            sequence: 0,
            max_utterance_samples,
        }
    }

    fn emit_utterance(&mut self) -> Utterance {
        let samples = std::mem::take(&mut self.buffer);
        let utterance = Utterance::new(samples, self.sequence);
        self.sequence += 1;
        // Stop capturing until the reply has been played back.
        self.signals.set_should_listen(false);
        tracing::info!(
            utterance = utterance.sequence,
            duration_ms = utterance.duration_ms(defaults::PIPELINE_SAMPLE_RATE),
            "utterance detected"
        );
        utterance
    }
}

impl Stage for VadStage {
    type Input = AudioFrame;
    type Output = Utterance;

    fn name(&self) -> &'static str {
        "vad"
    }

    fn process(&mut self, frame: AudioFrame) -> Result<Vec<Utterance>, StageError> {
        if !self.signals.should_listen() {
            // Not listening: discard audio and any half-built utterance.
            if !self.buffer.is_empty() {
                self.buffer.clear();
                self.vad.reset();
            }
            return Ok(Vec::new());
        }

        match self.vad.process(&frame.samples) {
            VadEvent::Silence => Ok(Vec::new()),
            VadEvent::SpeechStart => {
                self.buffer.clear();
                self.buffer.extend_from_slice(&frame.samples);
                Ok(Vec::new())
            }
            VadEvent::Speech => {
                self.buffer.extend_from_slice(&frame.samples);
                if self.buffer.len() >= self.max_utterance_samples {
                    // Unbounded monologue: hand over what we have.
                    self.vad.reset();
                    return Ok(vec![self.emit_utterance()]);
                }
                Ok(Vec::new())
            }
            VadEvent::SpeechEnd => {
                self.buffer.extend_from_slice(&frame.samples);
                Ok(vec![self.emit_utterance()])
            }
            VadEvent::SpeechAbandoned => {
                tracing::debug!("speech too short, discarded");
                self.buffer.clear();
                Ok(Vec::new())
            }
        }
    }
}
