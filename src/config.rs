use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub carrier: CarrierConfig,
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub assessment: AssessmentConfig,
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public domain the carrier reaches this bridge on (for webhook and
    /// media-stream URLs). Falls back to localhost when unset.
    pub public_domain: Option<String>,
}

/// Carrier account configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CarrierConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Caller-id for outbound calls.
    pub phone_number: String,
    /// Number dialed when `/call` is hit without a body number.
    pub user_number: Option<String>,
    pub api_base: String,
}

/// Audio framing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Inbound frame threshold in bytes of converted 16 kHz PCM.
    pub frame_bytes: usize,
    /// Samples per outbound playback frame.
    pub chunk_samples: usize,
    /// Bound on the per-call pending-audio buffer in bytes.
    pub max_pending_bytes: usize,
    pub vad_threshold: f32,
    pub silence_duration_ms: u32,
    pub min_speech_ms: u32,
}

/// Speech-to-text collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_id: String,
}

/// Language-model collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text-to-speech collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    /// Stream synthesis bytes as they arrive instead of downloading the
    /// complete buffer first.
    pub stream: bool,
}

/// Assessment collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Endpoint receiving termination payloads; `None` disables forwarding.
    pub endpoint: Option<String>,
    /// Directory where payloads are persisted.
    pub output_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::DEFAULT_PORT,
            public_domain: None,
        }
    }
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            phone_number: String::new(),
            user_number: None,
            api_base: "https://api.twilio.com".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_bytes: defaults::INBOUND_FRAME_BYTES,
            chunk_samples: defaults::PLAYBACK_CHUNK_SAMPLES,
            max_pending_bytes: defaults::MAX_PENDING_BYTES,
            vad_threshold: defaults::VAD_THRESHOLD,
            silence_duration_ms: defaults::SILENCE_DURATION_MS,
            min_speech_ms: defaults::MIN_SPEECH_MS,
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            model_id: "scribe_v1".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are conducting a simulated phone conversation to assess an \
                employee's security awareness. Keep replies short and natural; they will be \
                spoken aloud. When the assessment is complete, reply with [\"END CALL\"] \
                followed by a JSON object containing employee_id, security_score, \
                resistance_level and social_engineering_susceptibility."
                .to_string(),
            temperature: 0.7,
            max_tokens: 256,
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: String::new(),
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            output_format: "pcm_16000".to_string(),
            stream: true,
        }
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            endpoint: Some(defaults::ASSESSMENT_ENDPOINT.to_string()),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOICEBRIDGE_ACCOUNT_SID → carrier.account_sid
    /// - VOICEBRIDGE_AUTH_TOKEN → carrier.auth_token
    /// - VOICEBRIDGE_PHONE_NUMBER → carrier.phone_number
    /// - VOICEBRIDGE_USER_NUMBER → carrier.user_number
    /// - VOICEBRIDGE_DOMAIN → server.public_domain
    /// - ELEVENLABS_API_KEY → stt.api_key / tts.api_key (when unset)
    /// - OPENAI_API_KEY → llm.api_key (when unset)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(sid) = std::env::var("VOICEBRIDGE_ACCOUNT_SID")
            && !sid.is_empty()
        {
            self.carrier.account_sid = sid;
        }

        if let Ok(token) = std::env::var("VOICEBRIDGE_AUTH_TOKEN")
            && !token.is_empty()
        {
            self.carrier.auth_token = token;
        }

        if let Ok(number) = std::env::var("VOICEBRIDGE_PHONE_NUMBER")
            && !number.is_empty()
        {
            self.carrier.phone_number = number;
        }

        if let Ok(number) = std::env::var("VOICEBRIDGE_USER_NUMBER")
            && !number.is_empty()
        {
            self.carrier.user_number = Some(number);
        }

        if let Ok(domain) = std::env::var("VOICEBRIDGE_DOMAIN")
            && !domain.is_empty()
        {
            self.server.public_domain = Some(domain);
        }

        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY")
            && !key.is_empty()
        {
            if self.stt.api_key.is_empty() {
                self.stt.api_key = key.clone();
            }
            if self.tts.api_key.is_empty() {
                self.tts.api_key = key;
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY")
            && !key.is_empty()
            && self.llm.api_key.is_empty()
        {
            self.llm.api_key = key;
        }

        self
    }

    /// Names of required settings that are still missing.
    ///
    /// The server runs without them, but calls cannot be placed or
    /// transcribed until they are provided.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.carrier.account_sid.is_empty() {
            missing.push("carrier.account_sid");
        }
        if self.carrier.auth_token.is_empty() {
            missing.push("carrier.auth_token");
        }
        if self.carrier.phone_number.is_empty() {
            missing.push("carrier.phone_number");
        }
        if self.stt.api_key.is_empty() {
            missing.push("stt.api_key");
        }
        if self.llm.api_key.is_empty() {
            missing.push("llm.api_key");
        }
        if self.tts.api_key.is_empty() {
            missing.push("tts.api_key");
        }
        missing
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voicebridge/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicebridge")
            .join("config.toml")
    }

    /// The media-stream URL the carrier is told to connect to.
    pub fn stream_url(&self) -> String {
        match &self.server.public_domain {
            Some(domain) => {
                let domain = domain.trim_end_matches('/');
                if domain.starts_with("wss://") || domain.starts_with("ws://") {
                    format!("{}/stream", domain)
                } else {
                    format!("wss://{}/stream", domain)
                }
            }
            None => format!("ws://localhost:{}/stream", self.server.port),
        }
    }

    /// The webhook URL handed to the carrier for outbound calls.
    pub fn webhook_url(&self) -> String {
        match &self.server.public_domain {
            Some(domain) => {
                let domain = domain
                    .trim_end_matches('/')
                    .replace("wss://", "https://")
                    .replace("ws://", "http://");
                if domain.starts_with("http://") || domain.starts_with("https://") {
                    format!("{}/voice", domain)
                } else {
                    format!("https://{}/voice", domain)
                }
            }
            None => format!("http://localhost:{}/voice", self.server.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.audio.frame_bytes, 1024);
        assert_eq!(config.audio.chunk_samples, 512);
        assert_eq!(config.stt.model_id, "scribe_v1");
        assert_eq!(config.tts.output_format, "pcm_16000");
        assert!(config.tts.stream);
        assert!(config.assessment.endpoint.is_some());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[carrier]
account_sid = "AC123"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.carrier.account_sid, "AC123");
        // Untouched sections keep defaults.
        assert_eq!(config.audio.frame_bytes, 1024);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not = valid [ toml").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_settings_lists_empty_credentials() {
        let config = Config::default();
        let missing = config.missing_settings();
        assert!(missing.contains(&"carrier.account_sid"));
        assert!(missing.contains(&"stt.api_key"));
        assert!(missing.contains(&"llm.api_key"));
        assert!(missing.contains(&"tts.api_key"));
    }

    #[test]
    fn test_missing_settings_empty_when_configured() {
        let mut config = Config::default();
        config.carrier.account_sid = "AC1".into();
        config.carrier.auth_token = "tok".into();
        config.carrier.phone_number = "+15550000000".into();
        config.stt.api_key = "k1".into();
        config.llm.api_key = "k2".into();
        config.tts.api_key = "k3".into();
        assert!(config.missing_settings().is_empty());
    }

    #[test]
    fn test_stream_url_variants() {
        let mut config = Config::default();
        assert_eq!(config.stream_url(), "ws://localhost:8000/stream");

        config.server.public_domain = Some("bridge.example.com".into());
        assert_eq!(config.stream_url(), "wss://bridge.example.com/stream");

        config.server.public_domain = Some("wss://bridge.example.com".into());
        assert_eq!(config.stream_url(), "wss://bridge.example.com/stream");
    }

    #[test]
    fn test_webhook_url_rewrites_scheme() {
        let mut config = Config::default();
        assert_eq!(config.webhook_url(), "http://localhost:8000/voice");

        config.server.public_domain = Some("wss://bridge.example.com".into());
        assert_eq!(config.webhook_url(), "https://bridge.example.com/voice");

        config.server.public_domain = Some("bridge.example.com".into());
        assert_eq!(config.webhook_url(), "https://bridge.example.com/voice");
    }

    #[test]
    fn test_round_trip_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
