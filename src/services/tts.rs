//! Speech synthesis over the ElevenLabs text-to-speech HTTP API.

use crate::config::TtsConfig;
use crate::error::{BridgeError, Result};
use crate::services::SpeechSynthesizer;
use serde_json::json;
use std::io::{Cursor, Read};
use std::time::Duration;

/// Remote speech synthesizer.
///
/// Requests raw 16 kHz PCM (`pcm_16000`) so the response bytes feed the
/// speech chunker directly. In streaming mode the HTTP response body is
/// handed back as an incremental reader; otherwise the complete buffer is
/// downloaded first.
pub struct ElevenLabsSynthesizer {
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    output_format: String,
    stream: bool,
    client: reqwest::blocking::Client,
}

impl ElevenLabsSynthesizer {
    /// Creates a synthesizer from configuration.
    ///
    /// Must be constructed outside an async runtime: the blocking HTTP
    /// client manages its own.
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            voice_id: config.voice_id.clone(),
            model_id: config.model_id.clone(),
            output_format: config.output_format.clone(),
            stream: config.stream,
            client,
        })
    }

    fn endpoint(&self) -> String {
        if self.stream {
            format!("{}/v1/text-to-speech/{}/stream", self.base_url, self.voice_id)
        } else {
            format!("{}/v1/text-to-speech/{}", self.base_url, self.voice_id)
        }
    }
}

impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn synthesize(&self, text: &str) -> Result<Box<dyn Read + Send>> {
        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .query(&[("output_format", self.output_format.as_str())])
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BridgeError::Synthesis {
                message: format!("service returned {}: {}", status, body),
            });
        }

        if self.stream {
            // The blocking response body reads incrementally as bytes arrive.
            Ok(Box::new(response))
        } else {
            let bytes = response.bytes()?;
            Ok(Box::new(Cursor::new(bytes.to_vec())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn synthesizer_for(server_uri: &str, stream: bool) -> ElevenLabsSynthesizer {
        let config = TtsConfig {
            base_url: server_uri.to_string(),
            api_key: "test-key".to_string(),
            voice_id: "voice123".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "pcm_16000".to_string(),
            stream,
        };
        ElevenLabsSynthesizer::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_streaming_reads_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123/stream"))
            .and(header("xi-api-key", "test-key"))
            .and(query_param("output_format", "pcm_16000"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3, 4]))
            .mount(&server)
            .await;

        let uri = server.uri();
        let bytes = tokio::task::spawn_blocking(move || {
            let mut reader = synthesizer_for(&uri, true).synthesize("hello").unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            out
        })
        .await
        .unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_synthesize_batch_uses_plain_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8, 8]))
            .mount(&server)
            .await;

        let uri = server.uri();
        let bytes = tokio::task::spawn_blocking(move || {
            let mut reader = synthesizer_for(&uri, false).synthesize("hello").unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            out
        })
        .await
        .unwrap();
        assert_eq!(bytes, vec![9, 8]);
    }

    #[tokio::test]
    async fn test_synthesize_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice123/stream"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let result = tokio::task::spawn_blocking(move || {
            synthesizer_for(&uri, true).synthesize("hello").map(|_| ())
        })
        .await
        .unwrap();
        match result {
            Err(BridgeError::Synthesis { message }) => assert!(message.contains("401")),
            other => panic!("expected Synthesis error, got {:?}", other),
        }
    }
}
