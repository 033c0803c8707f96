//! End-of-interaction trigger and assessment handling.
//!
//! Generated text is inspected just before synthesis. When the agent emits
//! the termination marker (or a bare structured payload), the embedded
//! assessment JSON is repaired if truncated, timestamped, persisted locally,
//! and forwarded to the assessment collaborator. The caller then stops the
//! pipeline instead of synthesizing the text.

use crate::defaults::END_CALL_MARKER;
use crate::error::Result;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What the trigger decided about one generated text unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// No termination condition; synthesize the text normally.
    Synthesize,
    /// Terminate the call. `payload` holds the raw structured fragment to
    /// record, when one was present.
    EndCall { payload: Option<String> },
}

/// Inspects one generated text unit for a termination condition.
pub fn evaluate(text: &str) -> TriggerDecision {
    if text.contains(END_CALL_MARKER) {
        let payload = text.find('{').map(|start| text[start..].to_string());
        return TriggerDecision::EndCall { payload };
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return TriggerDecision::EndCall {
            payload: Some(trimmed.to_string()),
        };
    }

    TriggerDecision::Synthesize
}

/// Repairs a possibly-truncated JSON fragment.
///
/// Generation can cut off mid-object; the repair closes a dangling string
/// and appends the missing closing brace. Already-complete fragments pass
/// through unchanged.
pub fn repair_json(fragment: &str) -> String {
    let mut repaired = fragment.trim().to_string();
    if !repaired.ends_with('}') {
        if !repaired.ends_with('"') {
            repaired.push('"');
        }
        repaired.push('}');
    }
    repaired
}

/// How a termination payload ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Parsed, timestamped, persisted as JSON, and forwarded.
    Recorded { path: PathBuf },
    /// The fragment would not parse even after repair; the raw text was
    /// persisted instead and nothing was forwarded.
    SavedRaw { path: PathBuf },
}

/// Persists termination payloads and forwards them to the assessment
/// collaborator.
pub struct AssessmentSink {
    output_dir: PathBuf,
    endpoint: Option<String>,
    client: reqwest::blocking::Client,
}

impl AssessmentSink {
    /// Creates a sink writing into `output_dir` and forwarding to
    /// `endpoint` (forwarding is skipped when `endpoint` is `None`).
    ///
    /// Must be constructed outside an async runtime: the blocking HTTP
    /// client manages its own.
    pub fn new(output_dir: impl Into<PathBuf>, endpoint: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            output_dir: output_dir.into(),
            endpoint,
            client,
        })
    }

    /// Records one termination payload fragment.
    ///
    /// Parse failures are not errors: the raw text is kept so no assessment
    /// data is ever lost. Forwarding is fire-and-forget; failures are logged.
    pub fn record(&self, fragment: &str) -> Result<RecordOutcome> {
        let repaired = repair_json(fragment);
        let stamp = Utc::now();

        match serde_json::from_str::<Value>(&repaired) {
            Ok(Value::Object(mut payload)) => {
                payload.insert(
                    "timestamp".to_string(),
                    Value::String(stamp.to_rfc3339()),
                );
                let payload = Value::Object(payload);

                let path = self
                    .output_dir
                    .join(format!("security_analysis_{}.json", stamp.format("%Y%m%d_%H%M%S")));
                std::fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
                tracing::info!(path = %path.display(), "assessment payload saved");

                self.forward(&payload);
                Ok(RecordOutcome::Recorded { path })
            }
            _ => {
                let path = self
                    .output_dir
                    .join(format!("security_analysis_{}.txt", stamp.format("%Y%m%d_%H%M%S")));
                std::fs::write(&path, fragment)?;
                tracing::warn!(
                    path = %path.display(),
                    "assessment payload was not valid JSON, saved as text"
                );
                Ok(RecordOutcome::SavedRaw { path })
            }
        }
    }

    /// Forwards a parsed payload to the collaborator. Failure is logged,
    /// never raised.
    fn forward(&self, payload: &Value) {
        let Some(endpoint) = &self.endpoint else {
            return;
        };
        match self.client.post(endpoint).json(payload).send() {
            Ok(response) if response.status().is_success() => {
                tracing::info!(status = %response.status(), "assessment forwarded");
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "assessment endpoint rejected payload");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to forward assessment");
            }
        }
    }

    /// Directory that receives persisted payloads.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl std::fmt::Debug for AssessmentSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentSink")
            .field("output_dir", &self.output_dir)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Convenience: evaluates a text unit and records its payload when the call
/// should end. Returns the decision so the caller can stop the pipeline.
pub fn check_and_record(sink: &AssessmentSink, text: &str) -> Result<TriggerDecision> {
    let decision = evaluate(text);
    if let TriggerDecision::EndCall { payload: Some(fragment) } = &decision {
        sink.record(fragment)?;
    }
    Ok(decision)
}
