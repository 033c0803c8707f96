//! Pipeline orchestrator.
//!
//! Wires the fixed stage chain for one call run and supervises uniform
//! startup and shutdown:
//!
//! inbound queue → VAD → STT → LLM → TTS → outbound queue
//!
//! The bridge owns both end queues; the orchestrator owns the threads in
//! between. Stopping sets the shared `stop` signal and joins every stage
//! within a bounded grace period.

use crate::assessment::AssessmentSink;
use crate::audio::vad::VadConfig;
use crate::defaults;
use crate::pipeline::llm_stage::LlmStage;
use crate::pipeline::signals::PipelineSignals;
use crate::pipeline::stage::StageRunner;
use crate::pipeline::stt_stage::SttStage;
use crate::pipeline::tts_stage::TtsStage;
use crate::pipeline::types::AudioFrame;
use crate::pipeline::vad_stage::VadStage;
use crate::services::{ResponseGenerator, SpeechRecognizer, SpeechSynthesizer};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Voice-activity detection settings.
    pub vad: VadConfig,
    /// Samples per outbound playback frame.
    pub chunk_samples: usize,
    /// Capacity of the inbound audio queue.
    pub audio_buffer: usize,
    /// Capacity of the utterance and text queues.
    pub text_buffer: usize,
    /// Capacity of the outbound playback queue.
    pub playback_buffer: usize,
    /// Grace period for stages to exit after stop.
    pub stop_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            chunk_samples: defaults::PLAYBACK_CHUNK_SAMPLES,
            audio_buffer: 1024,
            text_buffer: 16,
            playback_buffer: 256,
            stop_grace: Duration::from_secs(defaults::STOP_GRACE_SECS),
        }
    }
}

/// The external collaborators a pipeline run needs.
#[derive(Clone)]
pub struct PipelineServices {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub assessment: Arc<AssessmentSink>,
}

/// Builds pipeline runs for media connections.
pub struct Pipeline {
    config: PipelineConfig,
    services: PipelineServices,
}

/// One launched pipeline run.
///
/// The bridge feeds `inbound`, drains `outbound`, and shares `signals` with
/// every stage. Dropping `inbound` lets the stage chain wind down on its
/// own; `handle.stop()` forces the issue.
pub struct PipelineRun {
    pub signals: Arc<PipelineSignals>,
    pub inbound: Sender<AudioFrame>,
    pub outbound: Receiver<AudioFrame>,
    pub handle: PipelineHandle,
}

impl Pipeline {
    /// Creates a pipeline factory.
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Self {
        Self { config, services }
    }

    /// Launches the stage chain for one call run.
    ///
    /// Returns once every stage thread is spawned.
    pub fn start(&self) -> PipelineRun {
        let signals = PipelineSignals::new();

        let (inbound_tx, inbound_rx) = bounded(self.config.audio_buffer);
        let (utterance_tx, utterance_rx) = bounded(self.config.text_buffer);
        let (prompt_tx, prompt_rx) = bounded(self.config.text_buffer);
        let (reply_tx, reply_rx) = bounded(self.config.text_buffer);
        let (outbound_tx, outbound_rx) = bounded(self.config.playback_buffer);

        let runners = vec![
            StageRunner::spawn(
                VadStage::new(self.config.vad, signals.clone()),
                inbound_rx,
                utterance_tx,
                signals.clone(),
            ),
            StageRunner::spawn(
                SttStage::new(self.services.recognizer.clone()),
                utterance_rx,
                prompt_tx,
                signals.clone(),
            ),
            StageRunner::spawn(
                LlmStage::new(self.services.generator.clone()),
                prompt_rx,
                reply_tx,
                signals.clone(),
            ),
            StageRunner::spawn(
                TtsStage::new(
                    self.services.synthesizer.clone(),
                    self.services.assessment.clone(),
                    signals.clone(),
                    self.config.chunk_samples,
                ),
                reply_rx,
                outbound_tx,
                signals.clone(),
            ),
        ];

        tracing::info!(stages = runners.len(), "pipeline started");

        PipelineRun {
            signals: signals.clone(),
            inbound: inbound_tx,
            outbound: outbound_rx,
            handle: PipelineHandle {
                runners,
                signals,
                stop_grace: self.config.stop_grace,
            },
        }
    }
}

/// Handle to the stage threads of one run.
pub struct PipelineHandle {
    runners: Vec<StageRunner>,
    signals: Arc<PipelineSignals>,
    stop_grace: Duration,
}

impl PipelineHandle {
    /// Sets the stop signal and waits for every stage to exit.
    ///
    /// Stages are joined as they finish so panics surface in the log. A
    /// stage still running when the grace period expires is detached and
    /// reported; it dies with the process.
    pub fn stop(mut self) {
        self.signals.request_stop();

        let deadline = Instant::now() + self.stop_grace;
        let poll_interval = Duration::from_millis(50);

        loop {
            let mut remaining = Vec::new();
            for runner in self.runners.drain(..) {
                if runner.is_finished() {
                    if let Err(msg) = runner.join() {
                        tracing::error!(error = %msg, "pipeline stage panicked");
                    }
                } else {
                    remaining.push(runner);
                }
            }
            self.runners = remaining;

            if self.runners.is_empty() {
                tracing::info!("pipeline stopped");
                return;
            }

            if Instant::now() >= deadline {
                for runner in self.runners.drain(..) {
                    tracing::error!(
                        stage = runner.name(),
                        "stage did not exit within the grace period, detaching"
                    );
                    runner.detach();
                }
                return;
            }

            std::thread::sleep(poll_interval);
        }
    }

    /// Returns true while any stage thread is still running.
    pub fn is_running(&self) -> bool {
        self.runners.iter().any(|r| !r.is_finished())
    }
}
