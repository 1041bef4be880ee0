//! Names and typed decoding for the daemon surface.
//!
//! The daemon speaks in named calls and named push events carrying JSON.
//! [`Call`] and [`EventKind`] enumerate the names; [`PushEvent`] ties each
//! payload type to its event so subscribers can decode without stringly
//! typed dispatch.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::{
    DaemonFailure, DaemonReady, DecodeError, FileReceived, Peer, PeerOffline, ReceiveError,
};

/// Request/response calls offered by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// Ordered collection of online peers
    ListPeers,
    /// Local device identity
    GetDeviceInfo,
    /// Directory received files land in
    GetDownloadDir,
    /// Whether the daemon finished starting
    CheckDaemonReady,
    /// Send a file to a peer
    SendFile,
}

impl Call {
    /// Every call, in surface order.
    pub const ALL: [Call; 5] = [
        Call::ListPeers,
        Call::GetDeviceInfo,
        Call::GetDownloadDir,
        Call::CheckDaemonReady,
        Call::SendFile,
    ];

    /// Wire name of the call.
    pub fn name(self) -> &'static str {
        match self {
            Call::ListPeers => "list_peers",
            Call::GetDeviceInfo => "get_device_info",
            Call::GetDownloadDir => "get_download_dir",
            Call::CheckDaemonReady => "check_daemon_ready",
            Call::SendFile => "send_file",
        }
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Call {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Call::ALL
            .into_iter()
            .find(|call| call.name() == s)
            .ok_or_else(|| DecodeError::UnknownCall(s.to_string()))
    }
}

/// Push notifications emitted by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A peer appeared
    PeerOnline,
    /// A peer went away
    PeerOffline,
    /// An inbound transfer completed
    FileReceived,
    /// An inbound transfer failed
    ReceiveError,
    /// The daemon finished starting
    DaemonReady,
    /// The daemon failed to start
    DaemonError,
}

impl EventKind {
    /// Every event, in surface order.
    pub const ALL: [EventKind; 6] = [
        EventKind::PeerOnline,
        EventKind::PeerOffline,
        EventKind::FileReceived,
        EventKind::ReceiveError,
        EventKind::DaemonReady,
        EventKind::DaemonError,
    ];

    /// Wire name of the event.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::PeerOnline => "peer-online",
            EventKind::PeerOffline => "peer-offline",
            EventKind::FileReceived => "file-received",
            EventKind::ReceiveError => "receive-error",
            EventKind::DaemonReady => "daemon-ready",
            EventKind::DaemonError => "daemon-error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DecodeError::UnknownEvent(s.to_string()))
    }
}

/// A payload type delivered on exactly one push event.
pub trait PushEvent: Sized + Send + 'static {
    /// The event this payload arrives on.
    const KIND: EventKind;

    /// Decode the payload from its JSON form.
    fn decode(payload: Value) -> Result<Self, DecodeError>;
}

fn decode_payload<T: DeserializeOwned>(
    context: &'static str,
    payload: Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|source| DecodeError::Payload { context, source })
}

fn encode_payload<T: Serialize>(context: &'static str, payload: &T) -> Result<Value, DecodeError> {
    serde_json::to_value(payload).map_err(|source| DecodeError::Encode { context, source })
}

impl PushEvent for Peer {
    const KIND: EventKind = EventKind::PeerOnline;

    fn decode(payload: Value) -> Result<Self, DecodeError> {
        decode_payload(Self::KIND.name(), payload)
    }
}

impl PushEvent for PeerOffline {
    const KIND: EventKind = EventKind::PeerOffline;

    fn decode(payload: Value) -> Result<Self, DecodeError> {
        decode_payload(Self::KIND.name(), payload)
    }
}

impl PushEvent for FileReceived {
    const KIND: EventKind = EventKind::FileReceived;

    fn decode(payload: Value) -> Result<Self, DecodeError> {
        decode_payload(Self::KIND.name(), payload)
    }
}

impl PushEvent for ReceiveError {
    const KIND: EventKind = EventKind::ReceiveError;

    fn decode(payload: Value) -> Result<Self, DecodeError> {
        decode_payload(Self::KIND.name(), payload)
    }
}

impl PushEvent for DaemonReady {
    const KIND: EventKind = EventKind::DaemonReady;

    // Whatever the daemon attaches is ignored.
    fn decode(_payload: Value) -> Result<Self, DecodeError> {
        Ok(DaemonReady)
    }
}

impl PushEvent for DaemonFailure {
    const KIND: EventKind = EventKind::DaemonError;

    fn decode(payload: Value) -> Result<Self, DecodeError> {
        decode_payload(Self::KIND.name(), payload)
    }
}

/// Any push event, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    /// A peer appeared
    PeerOnline(Peer),
    /// A peer went away
    PeerOffline(PeerOffline),
    /// An inbound transfer completed
    FileReceived(FileReceived),
    /// An inbound transfer failed
    ReceiveError(ReceiveError),
    /// The daemon finished starting
    DaemonReady,
    /// The daemon failed to start
    DaemonError(DaemonFailure),
}

impl DaemonEvent {
    /// Decode a payload received on the given event.
    pub fn decode(kind: EventKind, payload: Value) -> Result<Self, DecodeError> {
        Ok(match kind {
            EventKind::PeerOnline => Self::PeerOnline(Peer::decode(payload)?),
            EventKind::PeerOffline => Self::PeerOffline(PeerOffline::decode(payload)?),
            EventKind::FileReceived => Self::FileReceived(FileReceived::decode(payload)?),
            EventKind::ReceiveError => Self::ReceiveError(ReceiveError::decode(payload)?),
            EventKind::DaemonReady => Self::DaemonReady,
            EventKind::DaemonError => Self::DaemonError(DaemonFailure::decode(payload)?),
        })
    }

    /// The event this value is delivered on.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PeerOnline(_) => EventKind::PeerOnline,
            Self::PeerOffline(_) => EventKind::PeerOffline,
            Self::FileReceived(_) => EventKind::FileReceived,
            Self::ReceiveError(_) => EventKind::ReceiveError,
            Self::DaemonReady => EventKind::DaemonReady,
            Self::DaemonError(_) => EventKind::DaemonError,
        }
    }

    /// Encode the payload as the daemon would emit it.
    pub fn payload(&self) -> Result<Value, DecodeError> {
        let context = self.kind().name();
        match self {
            Self::PeerOnline(peer) => encode_payload(context, peer),
            Self::PeerOffline(offline) => encode_payload(context, offline),
            Self::FileReceived(received) => encode_payload(context, received),
            Self::ReceiveError(error) => encode_payload(context, error),
            Self::DaemonReady => Ok(Value::Null),
            Self::DaemonError(failure) => encode_payload(context, failure),
        }
    }
}
