//! Listener Registry
//!
//! Maps each chat to the listeners currently watching it and fans new
//! messages out to them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::listener::{ListenerQueue, Offer, RegistrationHandle, Subscription};
use crate::config::DeliverySettings;
use crate::domain::{ChatId, Message, UserId};
use crate::infrastructure::metrics;

struct Listener {
    user_id: UserId,
    queue: Arc<ListenerQueue>,
}

/// Outcome counts of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Listeners the message was queued for
    pub delivered: usize,
    /// Of those, listeners that lost their oldest buffered message
    pub dropped_oldest: usize,
    /// Listeners closed because their buffer was full
    pub disconnected: usize,
    /// Listeners skipped because they belong to the excluded user
    pub skipped: usize,
}

/// Concurrency-safe registry of live listeners, keyed by chat.
///
/// The map is a `DashMap`, so broadcasts take per-shard read locks while
/// register/unregister take per-shard write locks. No lock is ever held
/// across an await point.
pub struct ListenerRegistry {
    chats: DashMap<ChatId, HashMap<u64, Listener>>,
    next_id: AtomicU64,
    settings: DeliverySettings,
}

impl ListenerRegistry {
    pub fn new(settings: DeliverySettings) -> Self {
        Self {
            chats: DashMap::new(),
            next_id: AtomicU64::new(1),
            settings,
        }
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    /// Register a listener for `chat_id` on behalf of `user_id`.
    pub fn register(self: &Arc<Self>, chat_id: ChatId, user_id: UserId) -> Subscription {
        let listener_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(ListenerQueue::new(
            self.settings.buffer_size,
            self.settings.overflow_policy,
        ));

        self.chats.entry(chat_id).or_default().insert(
            listener_id,
            Listener {
                user_id,
                queue: Arc::clone(&queue),
            },
        );
        metrics::LISTENERS_ACTIVE.inc();

        tracing::debug!(
            chat_id = %chat_id,
            user_id = %user_id,
            listener_id,
            "Listener registered"
        );

        let handle = RegistrationHandle {
            chat_id,
            listener_id,
        };
        Subscription::new(handle, user_id, queue, Arc::downgrade(self))
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unregister(&self, handle: &RegistrationHandle) -> bool {
        let removed = {
            let Some(mut listeners) = self.chats.get_mut(&handle.chat_id) else {
                return false;
            };
            listeners.remove(&handle.listener_id)
        };

        let Some(listener) = removed else {
            return false;
        };

        listener.queue.close();
        self.chats
            .remove_if(&handle.chat_id, |_, listeners| listeners.is_empty());
        metrics::LISTENERS_ACTIVE.dec();

        tracing::debug!(
            chat_id = %handle.chat_id,
            user_id = %listener.user_id,
            listener_id = handle.listener_id,
            "Listener unregistered"
        );
        true
    }

    /// Deliver `message` to every listener of `chat_id`.
    pub fn broadcast(&self, chat_id: ChatId, message: Arc<Message>) -> BroadcastReport {
        self.deliver(chat_id, &message, None)
    }

    /// Deliver `message` to every listener of `chat_id` not owned by `excluded`.
    pub fn broadcast_except(
        &self,
        chat_id: ChatId,
        message: Arc<Message>,
        excluded: UserId,
    ) -> BroadcastReport {
        self.deliver(chat_id, &message, Some(excluded))
    }

    fn deliver(
        &self,
        chat_id: ChatId,
        message: &Arc<Message>,
        excluded: Option<UserId>,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        if let Some(listeners) = self.chats.get(&chat_id) {
            for (listener_id, listener) in listeners.iter() {
                if excluded == Some(listener.user_id) {
                    report.skipped += 1;
                    continue;
                }

                match listener.queue.offer(message) {
                    Offer::Delivered => report.delivered += 1,
                    Offer::DroppedOldest => {
                        report.delivered += 1;
                        report.dropped_oldest += 1;
                    }
                    Offer::Overflowed => {
                        report.disconnected += 1;
                        closed.push(*listener_id);
                    }
                    Offer::Closed => closed.push(*listener_id),
                }
            }
        }

        // The read guard is released; now it is safe to take write locks.
        for listener_id in closed {
            self.unregister(&RegistrationHandle {
                chat_id,
                listener_id,
            });
        }

        if report.disconnected > 0 {
            tracing::warn!(
                chat_id = %chat_id,
                message_id = %message.id,
                disconnected = report.disconnected,
                "Disconnected listeners with full buffers"
            );
        }

        metrics::record_broadcast(&report);
        report
    }

    /// Listeners currently registered for a chat.
    pub fn listener_count(&self, chat_id: ChatId) -> usize {
        self.chats
            .get(&chat_id)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Chats with at least one listener.
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// Listeners across all chats.
    pub fn total_listeners(&self) -> usize {
        self.chats.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(DeliverySettings::default())
    }
}
