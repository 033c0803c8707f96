//! Media WebSocket bridge.
//!
//! Two loops own the socket for a call's lifetime: the receive loop decodes
//! incoming events and feeds converted audio into the pipeline's inbound
//! queue, and the outbound relay drains the playback queue back to the
//! caller. Codec failures drop the affected chunk and the stream continues;
//! a socket disconnect ends both loops locally without touching the rest of
//! the pipeline.

use crate::audio::codec::{carrier_to_pipeline, pcm16_to_samples, pipeline_to_carrier,
    samples_to_pcm16};
use crate::defaults;
use crate::error::Result;
use crate::pipeline::signals::PipelineSignals;
use crate::pipeline::types::AudioFrame;
use crate::telephony::messages::{MediaMessage, OutboundMedia};
use crate::telephony::session::CallSession;
use axum::extract::ws::Message;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::{Sink, SinkExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Whether the receive loop should keep going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Receive-side state of the media WebSocket.
pub struct MediaBridge {
    session: CallSession,
    signals: Arc<PipelineSignals>,
    inbound: Sender<AudioFrame>,
    stream_sid: Arc<Mutex<Option<String>>>,
    frame_bytes: usize,
}

impl MediaBridge {
    /// Creates the bridge for one media connection.
    ///
    /// `stream_sid` is shared with the outbound relay, which needs the
    /// identifier to tag the media it sends.
    pub fn new(
        session: CallSession,
        signals: Arc<PipelineSignals>,
        inbound: Sender<AudioFrame>,
        stream_sid: Arc<Mutex<Option<String>>>,
        frame_bytes: usize,
    ) -> Self {
        Self {
            session,
            signals,
            inbound,
            stream_sid,
            frame_bytes,
        }
    }

    /// Handles one incoming text frame.
    ///
    /// Malformed or unknown messages are logged and ignored; the connection
    /// continues.
    pub fn handle_text(&mut self, text: &str) -> LoopControl {
        let message = match MediaMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unrecognized media message");
                return LoopControl::Continue;
            }
        };

        match message {
            MediaMessage::Start { stream_sid } => self.on_start(stream_sid),
            MediaMessage::Media { media, .. } => self.on_media(&media.payload),
            MediaMessage::Stop { .. } => self.on_stop(),
        }
    }

    fn on_start(&mut self, stream_sid: String) -> LoopControl {
        if !self.session.start_stream(stream_sid.clone()) {
            tracing::warn!(stream_sid = %stream_sid, "ignoring start for a second stream");
            return LoopControl::Continue;
        }
        tracing::info!(stream_sid = %stream_sid, "media stream started");
        *lock_unpoisoned(&self.stream_sid) = Some(stream_sid);
        self.signals.set_should_listen(true);
        LoopControl::Continue
    }

    fn on_media(&mut self, payload: &str) -> LoopControl {
        let mulaw = match BASE64.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "dropping media chunk with invalid base64");
                return LoopControl::Continue;
            }
        };

        let pcm = carrier_to_pipeline(&mulaw);
        self.session.push_audio(&pcm);

        for (sequence, frame) in self.session.drain_frames(self.frame_bytes) {
            let samples = pcm16_to_samples(&frame);
            if self
                .inbound
                .try_send(AudioFrame::new(samples, sequence))
                .is_err()
            {
                // Queue full or pipeline gone; real-time audio is not worth
                // blocking the socket for.
                tracing::warn!(sequence, "inbound queue full, frame dropped");
            }
        }
        LoopControl::Continue
    }

    fn on_stop(&mut self) -> LoopControl {
        tracing::info!("media stream stopped by carrier");
        self.session.end();
        LoopControl::Stop
    }

    /// Marks the session over after the socket closes.
    pub fn finish(mut self) -> CallSession {
        self.session.end();
        self.session
    }

    pub fn session(&self) -> &CallSession {
        &self.session
    }
}

/// Encodes one playback frame as an outgoing `media` message.
///
/// Fails when the PCM cannot be converted; the relay logs and drops the
/// chunk.
pub fn encode_outbound_frame(frame: &AudioFrame, stream_sid: &str) -> Result<String> {
    let pcm = samples_to_pcm16(&frame.samples);
    let mulaw = pipeline_to_carrier(&pcm)?;
    let payload = BASE64.encode(mulaw);
    Ok(OutboundMedia::new(stream_sid, payload).to_json())
}

/// Relays playback frames from the outbound queue to the caller.
///
/// Runs concurrently with the receive loop for the socket's lifetime:
/// while `stop` is unset and the socket is open, queued frames are
/// converted and sent; an empty queue sleeps briefly and rechecks rather
/// than busy-spinning.
pub async fn run_outbound_relay<S>(
    mut socket: S,
    outbound: Receiver<AudioFrame>,
    signals: Arc<PipelineSignals>,
    stream_sid: Arc<Mutex<Option<String>>>,
) where
    S: Sink<Message> + Unpin,
{
    let idle = Duration::from_millis(defaults::RELAY_IDLE_SLEEP_MS);

    while !signals.stop_requested() {
        match outbound.try_recv() {
            Ok(frame) => {
                let Some(sid) = lock_unpoisoned(&stream_sid).clone() else {
                    // No stream yet; nothing to address the audio to.
                    tracing::debug!("dropping playback frame before stream start");
                    continue;
                };
                match encode_outbound_frame(&frame, &sid) {
                    Ok(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            tracing::info!("media socket closed, relay exiting");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unconvertible playback frame");
                    }
                }
            }
            Err(TryRecvError::Empty) => tokio::time::sleep(idle).await,
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("playback queue closed, relay exiting");
                return;
            }
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
