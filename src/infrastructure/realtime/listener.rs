//! Listener queues and subscriptions.
//!
//! Every listener owns a bounded FIFO. The broadcaster only ever performs a
//! non-blocking push; when the buffer is full the configured
//! [`OverflowPolicy`] decides whether the oldest message is dropped or the
//! listener is closed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::registry::ListenerRegistry;
use crate::config::OverflowPolicy;
use crate::domain::{ChatId, Message, UserId};

/// Identifies one registration. Cheap to copy; unregistering it more than
/// once is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    pub chat_id: ChatId,
    pub listener_id: u64,
}

/// Result of offering a message to one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    Delivered,
    /// Delivered after evicting the oldest buffered message
    DroppedOldest,
    /// Buffer full under the disconnect policy; the listener is now closed
    Overflowed,
    /// Listener was already closed
    Closed,
}

pub(crate) struct ListenerQueue {
    buffer: Mutex<VecDeque<Arc<Message>>>,
    capacity: usize,
    policy: OverflowPolicy,
    closed: AtomicBool,
    notify: Notify,
}

impl ListenerQueue {
    pub(crate) fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Push without blocking.
    pub(crate) fn offer(&self, message: &Arc<Message>) -> Offer {
        if self.is_closed() {
            return Offer::Closed;
        }

        let outcome = {
            let mut buffer = self.buffer.lock();
            if buffer.len() < self.capacity {
                buffer.push_back(Arc::clone(message));
                Offer::Delivered
            } else {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        buffer.pop_front();
                        buffer.push_back(Arc::clone(message));
                        Offer::DroppedOldest
                    }
                    OverflowPolicy::Disconnect => Offer::Overflowed,
                }
            }
        };

        if outcome == Offer::Overflowed {
            self.close();
        } else {
            self.notify.notify_one();
        }

        outcome
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn pop(&self) -> Option<Arc<Message>> {
        self.buffer.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.buffer.lock().len()
    }
}

/// The receiving side of one listener registration.
///
/// Dropping a `Subscription` unregisters it, so a connection handler that
/// exits on any path (including a panic or task cancellation) leaves no
/// stale entry behind.
pub struct Subscription {
    handle: RegistrationHandle,
    user_id: UserId,
    queue: Arc<ListenerQueue>,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub(crate) fn new(
        handle: RegistrationHandle,
        user_id: UserId,
        queue: Arc<ListenerQueue>,
        registry: Weak<ListenerRegistry>,
    ) -> Self {
        Self {
            handle,
            user_id,
            queue,
            registry,
        }
    }

    pub fn handle(&self) -> RegistrationHandle {
        self.handle
    }

    pub fn chat_id(&self) -> ChatId {
        self.handle.chat_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the listener has been closed (unregistered or
    /// disconnected on overflow) and everything buffered before that has
    /// been handed out.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        loop {
            if let Some(message) = self.queue.pop() {
                return Some(message);
            }
            if self.queue.is_closed() {
                return self.queue.pop();
            }
            self.queue.notify.notified().await;
        }
    }

    /// Take a buffered message without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Message>> {
        self.queue.pop()
    }

    /// Number of messages waiting to be received.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether the registry has closed this listener.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Turn the subscription into a stream that ends when the listener closes.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Message>> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|message| (message, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.handle);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("user_id", &self.user_id)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
