//! Channel abstraction for the airdrop daemon.
//!
//! This module provides the boundary between the session and the daemon
//! process (an IPC bridge in production, [`MockDaemon`] for testing).
//!
//! # Design
//!
//! Two primitives, both async:
//! - `call()` invokes a named request and resolves to its JSON result
//! - `subscribe()` attaches one listener to a group of push events
//!
//! A [`Subscription`] is a single FIFO queue shared by every event of its
//! group, so events that belong to one logical stream (peer presence,
//! inbound transfers) come out in the order the daemon emitted them.
//! Dropping it (or calling [`Subscription::unsubscribe`]) detaches the
//! listener; payloads still buffered at that point are discarded with it.

mod mock;

pub use mock::{MockDaemon, PendingCall};

use airdrop_types::{Call, DecodeError, EventKind};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The daemon refused or failed a call.
    #[error("{call} failed: {message}")]
    CallFailed {
        /// The call that failed.
        call: Call,
        /// Failure description from the daemon.
        message: String,
    },

    /// A listener could not be attached.
    #[error("subscribing to {event} failed: {message}")]
    SubscribeFailed {
        /// The event that could not be subscribed.
        event: EventKind,
        /// Failure description.
        message: String,
    },

    /// A result payload did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The channel went away before answering.
    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    /// The daemon's own message where there is one, else the display form.
    pub fn into_message(self) -> String {
        match self {
            ChannelError::CallFailed { message, .. }
            | ChannelError::SubscribeFailed { message, .. } => message,
            other => other.to_string(),
        }
    }
}

/// Channel trait for reaching the daemon.
///
/// Implementations preserve emission order within one subscription and do
/// not deduplicate. Nothing is promised across subscriptions.
#[async_trait]
pub trait DaemonChannel: Send + Sync + 'static {
    /// Invoke a named call with JSON arguments.
    async fn call(&self, call: Call, args: Value) -> Result<Value, ChannelError>;

    /// Attach one listener to every event in `events`.
    ///
    /// All or nothing: if any event cannot be subscribed, no listener is
    /// attached.
    async fn subscribe(&self, events: &[EventKind]) -> Result<Subscription, ChannelError>;
}

/// One push as delivered: the event name and its raw payload.
pub type Delivery = (EventKind, Value);

/// Live listener on a group of push events.
#[derive(Debug)]
pub struct Subscription {
    events: Vec<EventKind>,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    /// Wrap the receiving half of an event queue.
    pub fn new(events: &[EventKind], rx: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self {
            events: events.to_vec(),
            rx,
        }
    }

    /// The events this listener is attached to.
    pub fn events(&self) -> &[EventKind] {
        &self.events
    }

    /// Next delivery, in emission order across the whole group.
    ///
    /// Returns `None` once the channel side is gone. Cancel safe.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Detach. No payload is delivered after this returns.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
