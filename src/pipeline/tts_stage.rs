//! Speech-synthesis stage.
//!
//! The last stage before the outbound relay. Each generated text unit is
//! first checked for the end-of-interaction trigger: termination text is
//! recorded and stops the call without spending synthesis cost. Normal text
//! is synthesized, reshaped into fixed-size playback frames by the speech
//! chunker, and queued for the bridge. Once a reply has been fully queued
//! the listening gate is re-armed.

use crate::assessment::{AssessmentSink, TriggerDecision, check_and_record};
use crate::pipeline::chunker::SpeechChunker;
use crate::pipeline::signals::PipelineSignals;
use crate::pipeline::stage::{Stage, StageError};
use crate::pipeline::types::AudioFrame;
use crate::services::SpeechSynthesizer;
use std::io::Read;
use std::sync::Arc;

/// Stage that turns agent replies into playback audio frames.
pub struct TtsStage {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    assessment: Arc<AssessmentSink>,
    signals: Arc<PipelineSignals>,
    chunk_samples: usize,
    sequence: u64,
}

impl TtsStage {
    /// Creates a TTS stage emitting frames of `chunk_samples` samples.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        assessment: Arc<AssessmentSink>,
        signals: Arc<PipelineSignals>,
        chunk_samples: usize,
    ) -> Self {
        Self {
            synthesizer,
            assessment,
            signals,
            chunk_samples,
            sequence: 0,
        }
    }

    fn frame(&mut self, samples: Vec<i16>) -> AudioFrame {
        let frame = AudioFrame::new(samples, self.sequence);
        self.sequence += 1;
        frame
    }

    fn synthesize_to_frames(&mut self, text: &str) -> Result<Vec<AudioFrame>, StageError> {
        let mut reader = self
            .synthesizer
            .synthesize(text)
            .map_err(|e| StageError::Recoverable(e.to_string()))?;

        let mut chunker = SpeechChunker::new(self.chunk_samples);
        let mut frames = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let read = reader
                .read(&mut buf)
                .map_err(|e| StageError::Recoverable(format!("speech stream failed: {}", e)))?;
            if read == 0 {
                break;
            }
            for samples in chunker.push(&buf[..read]) {
                frames.push(self.frame(samples));
            }
        }
        if let Some(samples) = chunker.finish() {
            frames.push(self.frame(samples));
        }
        Ok(frames)
    }
}

impl Stage for TtsStage {
    type Input = String;
    type Output = AudioFrame;

    fn name(&self) -> &'static str {
        "tts"
    }

    fn process(&mut self, text: String) -> Result<Vec<AudioFrame>, StageError> {
        match check_and_record(&self.assessment, &text) {
            Ok(TriggerDecision::EndCall { .. }) => {
                tracing::info!("end of interaction detected, stopping call");
                self.signals.request_stop();
                return Ok(Vec::new());
            }
            Ok(TriggerDecision::Synthesize) => {}
            Err(e) => {
                // Recording failed but the interaction is still over; do not
                // synthesize termination text at the caller.
                tracing::error!(error = %e, "failed to record assessment");
                self.signals.request_stop();
                return Ok(Vec::new());
            }
        }

        let frames = self.synthesize_to_frames(&text);
        // Whether or not synthesis worked, the turn is over: listen again.
        self.signals.set_should_listen(true);
        frames
    }
}
