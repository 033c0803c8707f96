//! Default configuration constants for voicebridge.
//!
//! Shared constants used across configuration types to keep the audio math
//! consistent between the telephony bridge and the pipeline stages.

/// Sample rate of the processing pipeline in Hz.
///
/// 16 kHz is the standard rate for speech recognition, and the rate the
/// speech-synthesis collaborator is asked to produce.
pub const PIPELINE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of carrier call audio in Hz.
///
/// Telephony media streams carry 8 kHz mu-law; everything crossing the
/// bridge is converted between this rate and [`PIPELINE_SAMPLE_RATE`].
pub const CARRIER_SAMPLE_RATE: u32 = 8_000;

/// Bytes per linear-PCM sample (16-bit little-endian).
pub const SAMPLE_WIDTH: usize = 2;

/// Inbound frame threshold in bytes of converted 16 kHz PCM.
///
/// 1024 bytes = 512 samples = 32 ms, the minimum frame the voice-activity
/// detector works on. Converted call audio accumulates in the session's
/// pending buffer and is sliced into frames of exactly this size.
pub const INBOUND_FRAME_BYTES: usize = 1024;

/// Samples per playback frame emitted by the speech chunker.
///
/// Synthesized speech is reshaped into frames of exactly this many 16-bit
/// samples before being queued for the outbound relay.
pub const PLAYBACK_CHUNK_SAMPLES: usize = 512;

/// Upper bound on the session's pending-audio buffer in bytes.
///
/// Roughly one second of converted audio. On overflow the oldest buffered
/// bytes are dropped rather than growing without limit.
pub const MAX_PENDING_BYTES: usize = 32 * INBOUND_FRAME_BYTES;

/// Literal marker the language model emits to end the interaction.
pub const END_CALL_MARKER: &str = "[\"END CALL\"]";

/// Default RMS threshold for detecting speech (0.0 to 1.0).
pub const VAD_THRESHOLD: f32 = 0.02;

/// Silence duration in milliseconds before an utterance is considered ended.
pub const SILENCE_DURATION_MS: u32 = 800;

/// Minimum speech duration in milliseconds for an utterance to be valid.
pub const MIN_SPEECH_MS: u32 = 300;

/// Hard cap on a single utterance in milliseconds; longer speech is emitted
/// early so the recognizer never receives an unbounded buffer.
pub const MAX_UTTERANCE_MS: u32 = 30_000;

/// Interval at which a blocked stage re-checks the stop signal.
pub const STAGE_POLL_MS: u64 = 250;

/// Grace period for stages to exit after stop is requested, in seconds.
pub const STOP_GRACE_SECS: u64 = 5;

/// Sleep between outbound-relay polls when the playback queue is empty.
pub const RELAY_IDLE_SLEEP_MS: u64 = 10;

/// Default port for the webhook server and media-stream endpoint.
pub const DEFAULT_PORT: u16 = 8000;

/// Default endpoint of the assessment collaborator.
pub const ASSESSMENT_ENDPOINT: &str = "http://localhost:8001/api/security-assessments";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_threshold_is_one_vad_frame() {
        // 32 ms at the pipeline rate, expressed in bytes.
        let samples = INBOUND_FRAME_BYTES / SAMPLE_WIDTH;
        let ms = samples as u32 * 1000 / PIPELINE_SAMPLE_RATE;
        assert_eq!(ms, 32);
    }

    #[test]
    fn pipeline_rate_is_double_carrier_rate() {
        assert_eq!(PIPELINE_SAMPLE_RATE, 2 * CARRIER_SAMPLE_RATE);
    }
}
