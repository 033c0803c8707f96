//! Response generation over an OpenAI-compatible chat-completions API.

use crate::config::LlmConfig;
use crate::error::{BridgeError, Result};
use crate::services::{ChatTurn, ResponseGenerator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Remote response generator using the chat-completions endpoint.
pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiGenerator {
    /// Creates a generator from configuration.
    ///
    /// Must be constructed outside an async runtime: the blocking HTTP
    /// client manages its own.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }
}

impl ResponseGenerator for OpenAiGenerator {
    fn generate(&self, history: &[ChatTurn]) -> Result<String> {
        let mut messages = vec![WireMessage {
            role: "system",
            content: &self.system_prompt,
        }];
        messages.extend(history.iter().map(|turn| WireMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        }));

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BridgeError::Generation {
                message: format!("service returned {}: {}", status, body),
            });
        }

        let parsed: CompletionResponse = response.json()?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| BridgeError::Generation {
                message: "completion response contained no choices".to_string(),
            })?;
        Ok(reply.trim().to_string())
    }
}
