//! Typed view of the daemon surface.
//!
//! [`DaemonApi`] wraps a [`DaemonChannel`] with one method per call, decoding
//! results into wire entities, and with grouped subscriptions that decode
//! push payloads into [`DaemonEvent`]s as they arrive.

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;

use airdrop_types::{Call, DaemonEvent, DecodeError, DeviceInfo, EventKind, Peer, SendFileArgs};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::channel::{ChannelError, DaemonChannel, Subscription};

/// Typed client over a daemon channel. Cheap to clone.
#[derive(Debug)]
pub struct DaemonApi<C> {
    channel: Arc<C>,
}

impl<C> Clone for DaemonApi<C> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
        }
    }
}

impl<C: DaemonChannel> DaemonApi<C> {
    /// Wrap a shared channel.
    pub fn new(channel: Arc<C>) -> Self {
        Self { channel }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn invoke<T: DeserializeOwned>(&self, call: Call, args: Value) -> Result<T, ChannelError> {
        let value = self.channel.call(call, args).await?;
        serde_json::from_value(value).map_err(|source| {
            ChannelError::Decode(DecodeError::Payload {
                context: call.name(),
                source,
            })
        })
    }

    /// Currently known peers, in daemon order.
    pub async fn list_peers(&self) -> Result<Vec<Peer>, ChannelError> {
        self.invoke(Call::ListPeers, Value::Null).await
    }

    /// Local device identity.
    pub async fn get_device_info(&self) -> Result<DeviceInfo, ChannelError> {
        self.invoke(Call::GetDeviceInfo, Value::Null).await
    }

    /// Directory received files land in.
    pub async fn get_download_dir(&self) -> Result<PathBuf, ChannelError> {
        self.invoke(Call::GetDownloadDir, Value::Null).await
    }

    /// Ask whether the daemon finished starting.
    pub async fn check_daemon_ready(&self) -> Result<bool, ChannelError> {
        self.invoke(Call::CheckDaemonReady, Value::Null).await
    }

    /// Hand a file to the daemon for sending.
    ///
    /// Whatever the daemon returns on success is ignored.
    pub async fn send_file(&self, peer_name: &str, file_path: &str) -> Result<(), ChannelError> {
        let args = SendFileArgs {
            peer_name: peer_name.to_string(),
            file_path: file_path.to_string(),
        };
        let args = serde_json::to_value(&args).map_err(|source| {
            ChannelError::Decode(DecodeError::Encode {
                context: Call::SendFile.name(),
                source,
            })
        })?;
        self.channel.call(Call::SendFile, args).await?;
        Ok(())
    }

    /// Subscribe to a group of push events as one ordered stream.
    pub async fn subscribe(&self, events: &[EventKind]) -> Result<EventStream, ChannelError> {
        let subscription = self.channel.subscribe(events).await?;
        Ok(EventStream::new(subscription))
    }
}

/// Decoded stream of a subscription group, in emission order.
///
/// Payloads that fail to decode are logged and skipped; they never end the
/// stream.
#[derive(Debug)]
pub struct EventStream {
    subscription: Subscription,
}

impl EventStream {
    fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Next decodable event, or `None` once the channel side is gone.
    ///
    /// Cancel safe.
    pub async fn next(&mut self) -> Option<DaemonEvent> {
        while let Some((kind, payload)) = self.subscription.recv().await {
            match DaemonEvent::decode(kind, payload) {
                Ok(event) => return Some(event),
                Err(e) => {
                    tracing::warn!(event = %kind, error = %e, "Skipping undecodable payload");
                }
            }
        }
        None
    }
}

/// Next item of an optional stream.
///
/// Pends forever while the stream is absent; a stream that ends is
/// cleared so it is not polled again.
pub(crate) async fn next_event(stream: &mut Option<EventStream>) -> DaemonEvent {
    if let Some(events) = stream {
        if let Some(event) = events.next().await {
            return event;
        }
        tracing::debug!(events = ?events.subscription.events(), "Event stream ended");
        *stream = None;
    }
    pending().await
}
