//! Speech-to-text stage.

use crate::pipeline::stage::{Stage, StageError};
use crate::pipeline::types::Utterance;
use crate::services::SpeechRecognizer;
use std::sync::Arc;

/// Stage that turns spoken utterances into text prompts.
///
/// Recognition failures are recoverable: the utterance is dropped and the
/// stage keeps serving the call. Empty transcripts are filtered out.
pub struct SttStage {
    recognizer: Arc<dyn SpeechRecognizer>,
}

impl SttStage {
    /// Creates an STT stage over the given recognizer.
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl Stage for SttStage {
    type Input = Utterance;
    type Output = String;

    fn name(&self) -> &'static str {
        "stt"
    }

    fn process(&mut self, utterance: Utterance) -> Result<Vec<String>, StageError> {
        let text = self
            .recognizer
            .transcribe(&utterance.samples)
            .map_err(|e| StageError::Recoverable(e.to_string()))?;

        if text.is_empty() {
            tracing::debug!(utterance = utterance.sequence, "no text detected, skipping");
            return Ok(Vec::new());
        }

        tracing::info!(text = %text, "caller said");
        Ok(vec![text])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockRecognizer;

    #[test]
    fn test_transcript_passed_downstream() {
        let recognizer = Arc::new(MockRecognizer::new().with_response("hello there"));
        let mut stage = SttStage::new(recognizer.clone());

        let out = stage.process(Utterance::new(vec![100; 512], 0)).unwrap();
        assert_eq!(out, vec!["hello there".to_string()]);
        assert_eq!(recognizer.call_count(), 1);
    }

    #[test]
    fn test_empty_transcript_is_filtered() {
        let recognizer = Arc::new(MockRecognizer::new().with_response(""));
        let mut stage = SttStage::new(recognizer);

        let out = stage.process(Utterance::new(vec![100; 512], 0)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_recognizer_failure_is_recoverable() {
        let recognizer = Arc::new(MockRecognizer::new().with_failure());
        let mut stage = SttStage::new(recognizer);

        let result = stage.process(Utterance::new(vec![100; 512], 0));
        assert!(matches!(result, Err(StageError::Recoverable(_))));
    }
}
