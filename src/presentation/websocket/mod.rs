//! Chat Streams
//!
//! Live delivery of a chat's new messages over WebSocket.

pub mod handler;
pub mod messages;
pub mod session;

pub use handler::stream_handler;
pub use messages::{ClientFrame, OpCode, StreamFrame};
pub use session::StreamSession;
