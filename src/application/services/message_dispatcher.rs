//! Message Dispatcher
//!
//! The write path of the chat core: validate, authorize, persist, then
//! broadcast to the chat's live listeners. Also synthesizes the join notices
//! stored with a new chat or a new member.
//!
//! Writes to one chat are serialized by a per-chat async lock held across
//! persist and broadcast, so listeners observe messages in exactly the order
//! they were stored. Different chats never contend.
//!
//! The locked section runs on its own task. A caller that goes away while
//! waiting (client disconnect, request timeout) does not stop a stored
//! message from being broadcast, and the lock entry is always released.

use std::future::Future;
use std::panic;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn, Instrument};

use super::error::ChatError;
use crate::config::DeliverySettings;
use crate::domain::{
    display_name_or_id, Chat, ChatAuthorization, ChatId, ChatStore, Membership, Message, UserId,
    MAX_MESSAGE_LENGTH,
};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::{BroadcastReport, ListenerRegistry};
use crate::shared::error::AppError;

type ChatLocks = DashMap<ChatId, Arc<Mutex<()>>>;

/// Persists messages and fans them out to live listeners.
pub struct MessageDispatcher {
    store: Arc<dyn ChatStore>,
    delivery: Delivery,
    authorization: ChatAuthorization<dyn ChatStore>,
    chat_locks: Arc<ChatLocks>,
}

/// Broadcast half of the dispatcher, owned by the locked write tasks.
#[derive(Clone)]
struct Delivery {
    registry: Arc<ListenerRegistry>,
    echo_to_sender: bool,
}

impl MessageDispatcher {
    pub fn new(
        store: Arc<dyn ChatStore>,
        registry: Arc<ListenerRegistry>,
        settings: &DeliverySettings,
    ) -> Self {
        Self {
            authorization: ChatAuthorization::new(Arc::clone(&store)),
            store,
            delivery: Delivery {
                registry,
                echo_to_sender: settings.echo_to_sender,
            },
            chat_locks: Arc::new(DashMap::new()),
        }
    }

    /// Number of chats with a write queued or in progress.
    pub fn writes_in_flight(&self) -> usize {
        self.chat_locks.len()
    }

    /// Post a user message to a chat.
    ///
    /// Nothing is broadcast unless the message was stored. Delivery problems
    /// for individual listeners never surface as errors.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn post_message(
        &self,
        sender: UserId,
        chat_id: ChatId,
        text: &str,
    ) -> Result<Message, ChatError> {
        validate_text(text)?;

        if !self.authorization.can_write(sender, chat_id).await? {
            return Err(ChatError::Forbidden(
                "You cannot post messages in this chat".into(),
            ));
        }

        let store = Arc::clone(&self.store);
        let delivery = self.delivery.clone();
        let text = text.to_owned();
        let message = self
            .serialized(chat_id, async move {
                let message = Message::user(chat_id, sender, text);
                store.append_message(&message).await?;
                metrics::record_message(message.kind);

                let message = Arc::new(message);
                delivery.deliver(&message);
                Ok::<_, ChatError>(message)
            })
            .await?;

        debug!(message_id = %message.id, "Message posted");
        Ok(Message::clone(&message))
    }

    /// Store a new chat with its members and one join notice per member,
    /// then broadcast the notices.
    #[instrument(skip(self, chat, members), fields(chat_id = %chat.id, members = members.len()))]
    pub async fn create_chat(
        &self,
        chat: &Chat,
        members: &[Membership],
    ) -> Result<Vec<Message>, ChatError> {
        let user_ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
        let names = self.store.display_names(&user_ids).await?;

        let store = Arc::clone(&self.store);
        let delivery = self.delivery.clone();
        let chat = chat.clone();
        let members = members.to_vec();
        self.serialized(chat.id, async move {
            let notices: Vec<Message> = members
                .iter()
                .map(|m| join_notice(chat.id, m.user_id, &display_name_or_id(&names, m.user_id)))
                .collect();

            store.create_chat(&chat, &members, &notices).await?;
            info!(chat_type = %chat.chat_type, "Chat created");

            for notice in &notices {
                metrics::record_message(notice.kind);
                delivery.deliver(&Arc::new(notice.clone()));
            }
            Ok::<_, ChatError>(notices)
        })
        .await
    }

    /// Add a member and store their join notice, then broadcast it.
    ///
    /// Fails with `Conflict` when the user already belongs to the chat.
    #[instrument(skip(self, membership), fields(chat_id = %membership.chat_id, user_id = %membership.user_id))]
    pub async fn add_member(&self, membership: &Membership) -> Result<Message, ChatError> {
        let names = self.store.display_names(&[membership.user_id]).await?;
        let name = display_name_or_id(&names, membership.user_id);

        let store = Arc::clone(&self.store);
        let delivery = self.delivery.clone();
        let membership = membership.clone();
        self.serialized(membership.chat_id, async move {
            let notice = join_notice(membership.chat_id, membership.user_id, &name);

            if !store.add_member(&membership, &notice).await? {
                return Err(ChatError::Conflict(
                    "User is already a member of this chat".into(),
                ));
            }
            info!(role = %membership.role, "Member added");

            metrics::record_message(notice.kind);
            delivery.deliver(&Arc::new(notice.clone()));
            Ok::<_, ChatError>(notice)
        })
        .await
    }

    /// Run `work` on its own task while holding the chat's write lock.
    ///
    /// `work` runs to completion even if the returned future is dropped.
    pub(crate) async fn serialized<T, F>(&self, chat_id: ChatId, work: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, ChatError>> + Send + 'static,
        T: Send + 'static,
    {
        let locks = Arc::clone(&self.chat_locks);
        let task = tokio::spawn(
            async move {
                let lock = Arc::clone(locks.entry(chat_id).or_default().value());
                let result = {
                    let _guard = lock.lock().await;
                    work.await
                };

                drop(lock);
                locks.remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);
                result
            }
            .in_current_span(),
        );

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ChatError::Store(AppError::Internal(format!(
                "Chat write task aborted: {}",
                e
            )))),
        }
    }
}

impl Delivery {
    fn deliver(&self, message: &Arc<Message>) -> BroadcastReport {
        let report = if self.echo_to_sender || message.is_system() {
            self.registry.broadcast(message.chat_id, Arc::clone(message))
        } else {
            self.registry
                .broadcast_except(message.chat_id, Arc::clone(message), message.author_id)
        };

        if report.dropped_oldest > 0 {
            warn!(
                chat_id = %message.chat_id,
                message_id = %message.id,
                dropped = report.dropped_oldest,
                "Slow listeners lost buffered messages"
            );
        }
        debug!(
            chat_id = %message.chat_id,
            message_id = %message.id,
            delivered = report.delivered,
            skipped = report.skipped,
            "Message broadcast"
        );
        report
    }
}

fn validate_text(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::Validation("Message text must not be empty".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::Validation(format!(
            "Message text must be at most {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

fn join_notice(chat_id: ChatId, user_id: UserId, name: &str) -> Message {
    Message::system(chat_id, user_id, format!("{} joined the chat", name))
}
