//! Mock daemon for testing.
//!
//! Allows configuring call responses, forcing failures, holding calls open
//! until the test resolves them, and emitting push events to every live
//! subscriber.

use super::{ChannelError, DaemonChannel, Delivery, Subscription};
use airdrop_types::{Call, EventKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

type Reply = Result<Value, String>;

/// In-process daemon.
///
/// Clones share state, so a test can keep one handle while the session
/// owns another.
#[derive(Debug, Default)]
pub struct MockDaemon {
    inner: Arc<Mutex<MockDaemonInner>>,
}

#[derive(Debug, Default)]
struct MockDaemonInner {
    responses: HashMap<Call, Value>,
    failures: HashMap<Call, VecDeque<String>>,
    deferred: HashMap<Call, VecDeque<oneshot::Receiver<Reply>>>,
    calls: Vec<(Call, Value)>,
    subscribers: HashMap<EventKind, Vec<mpsc::UnboundedSender<Delivery>>>,
    fail_next_subscribe: HashMap<EventKind, String>,
}

/// A call held open by [`MockDaemon::defer_next`].
///
/// Dropping it without resolving makes the call fail with
/// [`ChannelError::Closed`].
#[derive(Debug)]
pub struct PendingCall {
    call: Call,
    tx: oneshot::Sender<Reply>,
}

impl PendingCall {
    /// The call this handle answers.
    pub fn call(&self) -> Call {
        self.call
    }

    /// Answer the call successfully.
    ///
    /// Returns false if the caller already went away.
    pub fn resolve(self, value: Value) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Answer the call with a failure.
    ///
    /// Returns false if the caller already went away.
    pub fn fail(self, message: &str) -> bool {
        self.tx.send(Err(message.to_string())).is_ok()
    }
}

impl MockDaemon {
    /// Create a daemon that answers nothing and has no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockDaemonInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every future `call` with `value`.
    pub fn respond(&self, call: Call, value: Value) {
        self.lock().responses.insert(call, value);
    }

    /// Builder form of [`MockDaemon::respond`].
    pub fn with_response(self, call: Call, value: Value) -> Self {
        self.respond(call, value);
        self
    }

    /// Cause the next `call` to fail with the given message.
    ///
    /// Failures queue up and take precedence over responses.
    pub fn fail_next(&self, call: Call, message: &str) {
        self.lock()
            .failures
            .entry(call)
            .or_default()
            .push_back(message.to_string());
    }

    /// Hold the next `call` open until the returned handle answers it.
    pub fn defer_next(&self, call: Call) -> PendingCall {
        let (tx, rx) = oneshot::channel();
        self.lock().deferred.entry(call).or_default().push_back(rx);
        PendingCall { call, tx }
    }

    /// Cause the next subscription that includes `event` to fail.
    pub fn fail_next_subscribe(&self, event: EventKind, message: &str) {
        self.lock()
            .fail_next_subscribe
            .insert(event, message.to_string());
    }

    /// Push a payload to every live subscriber of `event`.
    ///
    /// Emission is synchronous, so successive calls reach each subscriber
    /// in call order. Returns the number of subscribers it was delivered to.
    pub fn emit(&self, event: EventKind, payload: Value) -> usize {
        let mut inner = self.lock();
        let Some(senders) = inner.subscribers.get_mut(&event) else {
            return 0;
        };
        let mut delivered = 0;
        senders.retain(|tx| match tx.send((event, payload.clone())) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        delivered
    }

    /// Number of live subscribers of `event`.
    pub fn subscriber_count(&self, event: EventKind) -> usize {
        self.lock()
            .subscribers
            .get(&event)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.iter().map(|(call, _)| *call).collect()
    }

    /// How many times `call` was received.
    pub fn call_count(&self, call: Call) -> usize {
        self.lock().calls.iter().filter(|(c, _)| *c == call).count()
    }

    /// Arguments of the most recent `call`.
    pub fn last_args(&self, call: Call) -> Option<Value> {
        self.lock()
            .calls
            .iter()
            .rev()
            .find(|(c, _)| *c == call)
            .map(|(_, args)| args.clone())
    }
}

impl Clone for MockDaemon {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl DaemonChannel for MockDaemon {
    async fn call(&self, call: Call, args: Value) -> Result<Value, ChannelError> {
        let pending = {
            let mut inner = self.lock();
            inner.calls.push((call, args));

            // Check for forced failure
            if let Some(message) = inner.failures.get_mut(&call).and_then(VecDeque::pop_front) {
                return Err(ChannelError::CallFailed { call, message });
            }

            match inner.deferred.get_mut(&call).and_then(VecDeque::pop_front) {
                Some(rx) => rx,
                None => {
                    return inner.responses.get(&call).cloned().ok_or_else(|| {
                        ChannelError::CallFailed {
                            call,
                            message: "no handler registered".to_string(),
                        }
                    })
                }
            }
        };

        match pending.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(ChannelError::CallFailed { call, message }),
            Err(_) => Err(ChannelError::Closed),
        }
    }

    async fn subscribe(&self, events: &[EventKind]) -> Result<Subscription, ChannelError> {
        let mut inner = self.lock();

        for &event in events {
            if let Some(message) = inner.fail_next_subscribe.remove(&event) {
                return Err(ChannelError::SubscribeFailed { event, message });
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for &event in events {
            inner.subscribers.entry(event).or_default().push(tx.clone());
        }
        Ok(Subscription::new(events, rx))
    }
}
