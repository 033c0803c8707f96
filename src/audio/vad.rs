//! Voice Activity Detection (VAD) module.
//!
//! Detects speech activity in audio frames using RMS-based thresholding and
//! state machine logic to handle silence intervals. Durations are counted in
//! samples rather than wall-clock time, so behavior is deterministic for a
//! given frame sequence.

use crate::defaults;

/// Configuration for Voice Activity Detection.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// RMS threshold for detecting speech (0.0 to 1.0).
    pub speech_threshold: f32,
    /// Duration of silence before speech is considered ended (milliseconds).
    pub silence_duration_ms: u32,
    /// Minimum duration of speech before it's considered valid (milliseconds).
    pub min_speech_ms: u32,
    /// Sample rate used to convert sample counts to durations.
    pub sample_rate: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            speech_threshold: defaults::VAD_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            min_speech_ms: defaults::MIN_SPEECH_MS,
            sample_rate: defaults::PIPELINE_SAMPLE_RATE,
        }
    }
}

/// Current state of voice activity detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VadState {
    /// No speech detected.
    Idle,
    /// Speech is being detected.
    Speaking,
    /// Silence detected, waiting to confirm speech end.
    TrailingSilence,
}

/// Events emitted by the VAD for each processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    /// No speech activity.
    Silence,
    /// Speech has started.
    SpeechStart,
    /// Ongoing speech (or a short pause inside it).
    Speech,
    /// Speech has ended and was long enough to be valid.
    SpeechEnd,
    /// Speech ended but was too short to be valid; discard it.
    SpeechAbandoned,
}

/// Voice Activity Detector state machine.
#[derive(Debug)]
pub struct Vad {
    config: VadConfig,
    state: VadState,
    speech_samples: usize,
    silence_samples: usize,
}

impl Vad {
    /// Creates a new VAD instance with the given configuration.
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: VadState::Idle,
            speech_samples: 0,
            silence_samples: 0,
        }
    }

    /// Processes one audio frame and returns the corresponding event.
    pub fn process(&mut self, samples: &[i16]) -> VadEvent {
        let rms = calculate_rms(samples);
        let is_speech = rms > self.config.speech_threshold;

        match self.state {
            VadState::Idle => {
                if is_speech {
                    self.state = VadState::Speaking;
                    self.speech_samples = samples.len();
                    self.silence_samples = 0;
                    VadEvent::SpeechStart
                } else {
                    VadEvent::Silence
                }
            }
            VadState::Speaking => {
                if is_speech {
                    self.speech_samples += samples.len();
                    VadEvent::Speech
                } else {
                    self.state = VadState::TrailingSilence;
                    self.silence_samples = samples.len();
                    self.check_speech_end()
                }
            }
            VadState::TrailingSilence => {
                if is_speech {
                    // Pause was short; the silence counts as speech time.
                    self.state = VadState::Speaking;
                    self.speech_samples += self.silence_samples + samples.len();
                    self.silence_samples = 0;
                    VadEvent::Speech
                } else {
                    self.silence_samples += samples.len();
                    self.check_speech_end()
                }
            }
        }
    }

    /// Resets the detector to idle.
    pub fn reset(&mut self) {
        self.state = VadState::Idle;
        self.speech_samples = 0;
        self.silence_samples = 0;
    }

    /// Accumulated speech duration of the current utterance in milliseconds.
    pub fn speech_ms(&self) -> u32 {
        self.samples_to_ms(self.speech_samples)
    }

    fn check_speech_end(&mut self) -> VadEvent {
        if self.samples_to_ms(self.silence_samples) < self.config.silence_duration_ms {
            return VadEvent::Speech;
        }

        let long_enough = self.samples_to_ms(self.speech_samples) >= self.config.min_speech_ms;
        self.reset();
        if long_enough {
            VadEvent::SpeechEnd
        } else {
            VadEvent::SpeechAbandoned
        }
    }

    fn samples_to_ms(&self, samples: usize) -> u32 {
        (samples as u64 * 1000 / self.config.sample_rate as u64) as u32
    }
}

/// Calculates the normalized RMS level of a frame (0.0 to 1.0).
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / 32_768.0;
            normalized * normalized
        })
        .sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VadConfig {
        VadConfig {
            speech_threshold: 0.02,
            silence_duration_ms: 200,
            min_speech_ms: 50,
            sample_rate: 16_000,
        }
    }

    fn loud_frame(ms: u32) -> Vec<i16> {
        vec![10_000i16; (16 * ms) as usize]
    }

    fn quiet_frame(ms: u32) -> Vec<i16> {
        vec![0i16; (16 * ms) as usize]
    }

    #[test]
    fn test_rms_of_silence_is_zero() {
        assert_eq!(calculate_rms(&quiet_frame(10)), 0.0);
        assert_eq!(calculate_rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_loud_frame() {
        let rms = calculate_rms(&loud_frame(10));
        assert!((rms - 10_000.0 / 32_768.0).abs() < 0.001);
    }

    #[test]
    fn test_idle_silence_stays_idle() {
        let mut vad = Vad::new(test_config());
        assert_eq!(vad.process(&quiet_frame(10)), VadEvent::Silence);
        assert_eq!(vad.process(&quiet_frame(10)), VadEvent::Silence);
    }

    #[test]
    fn test_speech_start_and_continue() {
        let mut vad = Vad::new(test_config());
        assert_eq!(vad.process(&loud_frame(10)), VadEvent::SpeechStart);
        assert_eq!(vad.process(&loud_frame(10)), VadEvent::Speech);
        assert_eq!(vad.speech_ms(), 20);
    }

    #[test]
    fn test_speech_end_after_silence_threshold() {
        let mut vad = Vad::new(test_config());
        vad.process(&loud_frame(100));

        // 200 ms of silence confirms the end of speech.
        assert_eq!(vad.process(&quiet_frame(100)), VadEvent::Speech);
        assert_eq!(vad.process(&quiet_frame(100)), VadEvent::SpeechEnd);
    }

    #[test]
    fn test_short_speech_is_abandoned() {
        let mut vad = Vad::new(test_config());
        // 10 ms of speech is below the 50 ms minimum.
        vad.process(&loud_frame(10));
        assert_eq!(vad.process(&quiet_frame(250)), VadEvent::SpeechAbandoned);
    }

    #[test]
    fn test_short_pause_does_not_end_speech() {
        let mut vad = Vad::new(test_config());
        vad.process(&loud_frame(100));
        // 100 ms pause is below the 200 ms silence threshold.
        assert_eq!(vad.process(&quiet_frame(100)), VadEvent::Speech);
        // Speech resumes; the pause is folded into the utterance.
        assert_eq!(vad.process(&loud_frame(10)), VadEvent::Speech);
        assert_eq!(vad.speech_ms(), 210);
    }

    #[test]
    fn test_detector_is_reusable_after_speech_end() {
        let mut vad = Vad::new(test_config());
        vad.process(&loud_frame(100));
        vad.process(&quiet_frame(250));

        assert_eq!(vad.process(&quiet_frame(10)), VadEvent::Silence);
        assert_eq!(vad.process(&loud_frame(10)), VadEvent::SpeechStart);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut vad = Vad::new(test_config());
        vad.process(&loud_frame(100));
        vad.reset();
        assert_eq!(vad.speech_ms(), 0);
        assert_eq!(vad.process(&loud_frame(10)), VadEvent::SpeechStart);
    }
}
