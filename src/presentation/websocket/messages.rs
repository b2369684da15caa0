//! Stream Frame Types
//!
//! Every frame on a chat stream is a JSON object `{op, t?, d?, s?}`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::dto::response::MessageResponse;

/// Dispatch event name for a newly posted message
pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

/// Stream opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch (server to client)
    Dispatch = 0,
    /// Heartbeat (client to server)
    Heartbeat = 1,
    /// Hello, sent once after the upgrade
    Hello = 10,
    /// Heartbeat ACK
    HeartbeatAck = 11,
}

impl OpCode {
    pub fn from_u8(op: u8) -> Option<Self> {
        match op {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }
}

/// Incoming client frame
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub op: u8,
    #[serde(default)]
    pub d: Option<serde_json::Value>,
}

/// Outgoing server frame
#[derive(Debug, Clone, Serialize)]
pub struct StreamFrame {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<&'static str>,
}

/// Hello payload (op 10)
#[derive(Debug, Serialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
    pub chat_id: String,
}

impl StreamFrame {
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            op: OpCode::Hello as u8,
            d: Some(json!(payload)),
            s: None,
            t: None,
        }
    }

    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck as u8,
            d: None,
            s: None,
            t: None,
        }
    }

    pub fn message_create(message: MessageResponse, sequence: u64) -> Self {
        Self {
            op: OpCode::Dispatch as u8,
            d: Some(json!(message)),
            s: Some(sequence),
            t: Some(MESSAGE_CREATE),
        }
    }
}
