//! Stream Session State

use std::time::{Duration, Instant};

use crate::domain::{ChatId, UserId};

/// Per-connection state of a chat stream
#[derive(Debug)]
pub struct StreamSession {
    pub user_id: UserId,
    pub chat_id: ChatId,
    sequence: u64,
    last_heartbeat: Instant,
}

impl StreamSession {
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            chat_id,
            sequence: 0,
            last_heartbeat: Instant::now(),
        }
    }

    /// Sequence number for the next dispatch, starting at 1.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_heartbeat.elapsed() < timeout
    }
}
