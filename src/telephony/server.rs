//! Webhook server and media-stream endpoint.
//!
//! Routes:
//! - `POST /voice` answers a carrier call webhook with a markup document
//!   directing the carrier to open a media stream to `/stream`.
//! - `POST /call` places an outbound call to the number in the body (or
//!   the configured user number).
//! - `GET /stream` is the duplex media WebSocket.
//! - `GET /health` is a liveness probe.

use crate::config::Config;
use crate::pipeline::orchestrator::{Pipeline, PipelineRun};
use crate::telephony::bridge::{LoopControl, MediaBridge, run_outbound_relay};
use crate::telephony::carrier::CarrierApi;
use crate::telephony::session::{CallDirection, CallSession};
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Json, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state of the webhook server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub carrier: Arc<dyn CarrierApi>,
    pub pipeline: Arc<Pipeline>,
    /// Identifier of the call currently being bridged, if any.
    pub active_call: Arc<Mutex<Option<String>>>,
}

impl AppState {
    /// Creates server state.
    pub fn new(config: Config, carrier: Arc<dyn CarrierApi>, pipeline: Pipeline) -> Self {
        Self {
            config: Arc::new(config),
            carrier,
            pipeline: Arc::new(pipeline),
            active_call: Arc::new(Mutex::new(None)),
        }
    }

    fn set_active_call(&self, sid: String) {
        *lock_unpoisoned(&self.active_call) = Some(sid);
    }

    /// Marks the active call completed via the carrier and clears it.
    /// A no-op (logged) when no call is active.
    pub async fn terminate_active_call(&self) {
        let sid = lock_unpoisoned(&self.active_call).take();
        match sid {
            Some(sid) => match self.carrier.complete_call(&sid).await {
                Ok(()) => tracing::info!(call_sid = %sid, "call terminated"),
                Err(e) => tracing::error!(call_sid = %sid, error = %e, "failed to terminate call"),
            },
            None => tracing::info!("no active call to terminate"),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/voice", post(handle_voice))
        .route("/call", post(handle_call))
        .route("/stream", get(handle_stream))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        // The carrier and the admin frontend call in from anywhere.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Markup document telling the carrier to open a media stream.
fn connect_stream_document(stream_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"{}\" /></Connect></Response>",
        stream_url
    )
}

/// Incoming call webhook.
async fn handle_voice(State(state): State<AppState>) -> impl IntoResponse {
    let stream_url = state.config.stream_url();
    tracing::info!(stream_url = %stream_url, "incoming call, connecting media stream");
    (
        [(header::CONTENT_TYPE, "application/xml")],
        connect_stream_document(&stream_url),
    )
}

#[derive(Debug, Deserialize, Default)]
struct CallRequest {
    phone: Option<String>,
}

/// Outbound call trigger.
async fn handle_call(
    State(state): State<AppState>,
    Json(request): Json<CallRequest>,
) -> Response {
    let target = request
        .phone
        .or_else(|| state.config.carrier.user_number.clone());
    let Some(target) = target else {
        tracing::warn!("outbound call requested without a target number");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing 'phone' in request body"})),
        )
            .into_response();
    };

    let from = state.config.carrier.phone_number.clone();
    let webhook_url = state.config.webhook_url();
    match state.carrier.create_call(&from, &target, &webhook_url).await {
        Ok(sid) => {
            tracing::info!(call_sid = %sid, to = %target, "outbound call initiated");
            state.set_active_call(sid);
            Json(json!({"status": "initiated", "to": target})).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, to = %target, "failed to initiate call");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "Failed to initiate call"})),
            )
                .into_response()
        }
    }
}

/// Liveness probe.
async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Media WebSocket upgrade.
async fn handle_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state))
}

/// Runs the two media loops for one WebSocket connection, then tears the
/// call down.
async fn handle_media_socket(socket: WebSocket, state: AppState) {
    tracing::info!("media socket connected");

    let run: PipelineRun = state.pipeline.start();
    let signals = run.signals.clone();
    let stream_sid = Arc::new(Mutex::new(None));

    let (ws_tx, mut ws_rx) = socket.split();
    let relay = tokio::spawn(run_outbound_relay(
        ws_tx,
        run.outbound,
        signals.clone(),
        stream_sid.clone(),
    ));

    let mut session = CallSession::new(CallDirection::Inbound)
        .with_max_pending(state.config.audio.max_pending_bytes);
    session.connect();
    let mut bridge = MediaBridge::new(
        session,
        signals.clone(),
        run.inbound,
        stream_sid,
        state.config.audio.frame_bytes,
    );

    let mut stop_poll = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            message = ws_rx.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if bridge.handle_text(text.as_str()) == LoopControl::Stop {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("media socket disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "media socket error");
                        break;
                    }
                }
            }
            _ = stop_poll.tick() => {
                if signals.stop_requested() {
                    tracing::info!("stop requested, leaving media loop");
                    break;
                }
            }
        }
    }

    let session = bridge.finish();
    tracing::info!(
        stream_sid = session.stream_sid().unwrap_or("<none>"),
        "media loops finished"
    );

    // Wind the stage threads down off the async runtime.
    let handle = run.handle;
    let stopped = tokio::task::spawn_blocking(move || handle.stop());

    // A trigger- or bridge-requested stop hangs the carrier call up too.
    if signals.stop_requested() {
        state.terminate_active_call().await;
    } else {
        signals.request_stop();
    }

    if let Err(e) = stopped.await {
        tracing::error!(error = %e, "pipeline shutdown task failed");
    }
    // The relay observes the stop signal on its next poll.
    if tokio::time::timeout(Duration::from_secs(1), relay).await.is_err() {
        tracing::warn!("outbound relay did not exit promptly");
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
