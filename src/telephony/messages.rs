//! Media-stream wire messages.
//!
//! The carrier speaks JSON text frames over the media WebSocket. Incoming
//! frames are decoded once at the boundary into a closed enum and matched
//! exhaustively; unknown event tags fail decoding and are logged and
//! ignored by the receive loop.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// Base64 media payload carried by `media` events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaPayload {
    pub payload: String,
}

/// An incoming media-stream event.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum MediaMessage {
    /// The media stream opened; audio follows.
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
    /// One chunk of base64 mu-law call audio.
    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        media: MediaPayload,
    },
    /// The media stream closed.
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },
}

impl MediaMessage {
    /// Decodes one incoming text frame.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BridgeError::MediaProtocol {
            message: e.to_string(),
        })
    }
}

/// An outgoing `media` message carrying synthesized audio to the caller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundMedia {
    event: &'static str,
    #[serde(rename = "streamSid")]
    stream_sid: String,
    media: MediaPayload,
}

impl OutboundMedia {
    /// Creates a media message for the given stream.
    pub fn new(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.into(),
            media: MediaPayload {
                payload: payload.into(),
            },
        }
    }

    /// Serializes to the wire format.
    pub fn to_json(&self) -> String {
        // Serialization of this shape cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
