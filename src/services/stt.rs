//! Speech-to-text over the ElevenLabs Scribe HTTP API.

use crate::audio::codec::samples_to_pcm16;
use crate::config::SttConfig;
use crate::error::{BridgeError, Result};
use crate::services::SpeechRecognizer;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// Remote speech recognizer using the Scribe transcription endpoint.
///
/// Audio is posted as raw 16-bit little-endian PCM at 16 kHz
/// (`pcm_s16le_16`), so no container encoding is needed.
pub struct ScribeRecognizer {
    base_url: String,
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl ScribeRecognizer {
    /// Creates a recognizer from configuration.
    ///
    /// Must be constructed outside an async runtime: the blocking HTTP
    /// client manages its own.
    pub fn new(config: &SttConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
            client,
        })
    }
}

impl SpeechRecognizer for ScribeRecognizer {
    fn transcribe(&self, audio: &[i16]) -> Result<String> {
        let form = Form::new()
            .part(
                "file",
                Part::bytes(samples_to_pcm16(audio))
                    .file_name("audio.raw")
                    .mime_str("application/octet-stream")
                    .map_err(|e| BridgeError::Transcription {
                        message: e.to_string(),
                    })?,
            )
            .text("model_id", self.model_id.clone())
            .text("file_format", "pcm_s16le_16");

        let response = self
            .client
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BridgeError::Transcription {
                message: format!("service returned {}: {}", status, body),
            });
        }

        let parsed: TranscriptionResponse = response.json()?;
        Ok(parsed.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recognizer_for(server_uri: &str) -> ScribeRecognizer {
        let config = SttConfig {
            base_url: server_uri.to_string(),
            api_key: "test-key".to_string(),
            model_id: "scribe_v1".to_string(),
        };
        ScribeRecognizer::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/speech-to-text"))
            .and(header("xi-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": " hello "})),
            )
            .mount(&server)
            .await;

        let uri = server.uri();
        let text = tokio::task::spawn_blocking(move || {
            recognizer_for(&uri).transcribe(&[100i16; 512])
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_transcribe_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/speech-to-text"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            recognizer_for(&uri).transcribe(&[0i16; 512])
        })
        .await
        .unwrap();
        match result {
            Err(BridgeError::Transcription { message }) => {
                assert!(message.contains("500"));
            }
            other => panic!("expected Transcription error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_transcribe_tolerates_missing_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/speech-to-text"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let uri = server.uri();
        let text = tokio::task::spawn_blocking(move || {
            recognizer_for(&uri).transcribe(&[0i16; 512])
        })
        .await
        .unwrap()
        .unwrap();
        assert!(text.is_empty());
    }
}
