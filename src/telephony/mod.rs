//! Telephony bridge.
//!
//! Terminates the carrier's webhooks and duplex media WebSocket, converts
//! between carrier and pipeline audio encodings, and manages the call
//! lifecycle.

pub mod bridge;
pub mod carrier;
pub mod messages;
pub mod server;
pub mod session;

pub use bridge::{LoopControl, MediaBridge, run_outbound_relay};
pub use carrier::{CarrierApi, TwilioClient};
pub use messages::{MediaMessage, OutboundMedia};
pub use server::{AppState, create_router};
pub use session::{CallDirection, CallSession, CallState};
