//! Real-time Delivery
//!
//! In-process fan-out of new messages to the listeners connected to a chat.
//!
//! - [`ListenerRegistry`]: chat id to live listeners, with broadcast
//! - [`Subscription`]: the receiving end of one registration; unregisters on drop
//!
//! Each listener owns a bounded buffer. A slow listener only ever affects
//! itself: depending on [`OverflowPolicy`](crate::config::OverflowPolicy) it
//! loses its oldest buffered messages or gets disconnected.

mod listener;
mod registry;

pub use listener::{RegistrationHandle, Subscription};
pub use registry::{BroadcastReport, ListenerRegistry};
