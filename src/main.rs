use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use voicebridge::assessment::AssessmentSink;
use voicebridge::cli::{Cli, Commands};
use voicebridge::config::Config;
use voicebridge::pipeline::orchestrator::{Pipeline, PipelineConfig, PipelineServices};
use voicebridge::services::{ElevenLabsSynthesizer, OpenAiGenerator, ScribeRecognizer};
use voicebridge::telephony::carrier::TwilioClient;
use voicebridge::telephony::server::{AppState, create_router};
use voicebridge::{audio, defaults};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&config),
        Some(Commands::Serve) | None => serve(config),
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path: PathBuf = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?
        .with_env_overrides();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn check_config(config: &Config) -> Result<()> {
    let missing = config.missing_settings();
    println!("server:     {}:{}", config.server.host, config.server.port);
    println!("stream url: {}", config.stream_url());
    println!("webhook:    {}", config.webhook_url());
    if missing.is_empty() {
        println!("configuration complete");
        Ok(())
    } else {
        for key in &missing {
            println!("missing: {}", key);
        }
        anyhow::bail!("{} required settings missing", missing.len());
    }
}

fn serve(config: Config) -> Result<()> {
    tracing::info!(version = %voicebridge::version_string(), "starting voicebridge");

    for key in config.missing_settings() {
        tracing::warn!(setting = key, "setting not configured, related calls will fail");
    }

    // Collaborator clients use blocking HTTP from the stage threads and
    // must be built before the async runtime exists.
    let services = build_services(&config)?;
    let pipeline = Pipeline::new(pipeline_config(&config), services);

    let carrier = Arc::new(TwilioClient::new(
        config.carrier.account_sid.clone(),
        config.carrier.auth_token.clone(),
        config.carrier.api_base.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, carrier, pipeline);
    let app = create_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        tracing::info!(addr = %addr, "webhook server listening");
        axum::serve(listener, app).await.context("serving")
    })
}

fn build_services(config: &Config) -> Result<PipelineServices> {
    Ok(PipelineServices {
        recognizer: Arc::new(ScribeRecognizer::new(&config.stt)?),
        generator: Arc::new(OpenAiGenerator::new(&config.llm)?),
        synthesizer: Arc::new(ElevenLabsSynthesizer::new(&config.tts)?),
        assessment: Arc::new(AssessmentSink::new(
            config.assessment.output_dir.clone(),
            config.assessment.endpoint.clone(),
        )?),
    })
}

fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        vad: audio::VadConfig {
            speech_threshold: config.audio.vad_threshold,
            silence_duration_ms: config.audio.silence_duration_ms,
            min_speech_ms: config.audio.min_speech_ms,
            sample_rate: defaults::PIPELINE_SAMPLE_RATE,
        },
        chunk_samples: config.audio.chunk_samples,
        ..Default::default()
    }
}
