//! Daemon payloads for airdrop.
//!
//! Field names follow the daemon's JSON surface (`addr`, `fileName`, ...);
//! the Rust side uses descriptive names and serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::PeerId;

/// A discovered remote endpoint able to send and receive files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Unique key within the peer set
    pub id: PeerId,
    /// Human-readable device name
    pub name: String,
    /// Network address as reported by the daemon
    #[serde(rename = "addr")]
    pub address: String,
}

impl Peer {
    /// Create a new peer.
    pub fn new(id: impl Into<PeerId>, name: &str, address: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

/// Identity of the local device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name advertised to peers
    pub name: String,
    /// Port the daemon listens on for transfers
    pub port: u16,
}

/// `peer-offline` payload. Only the id is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerOffline {
    /// Peer that went away
    pub id: PeerId,
}

/// `file-received` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReceived {
    /// Sender, as the daemon names it
    pub from: String,
    /// Name of the received file
    pub file_name: String,
    /// Where the daemon stored the file
    #[serde(rename = "file")]
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// When the transfer completed
    pub timestamp: DateTime<Utc>,
}

/// `receive-error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveError {
    /// Sender, or "unknown" when the daemon could not tell
    pub from: String,
    /// Failure description
    pub error: String,
}

/// `daemon-ready` marker. The payload carries nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaemonReady;

/// `daemon-error` payload.
///
/// Accepts both `{"message": "..."}` and a bare JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DaemonFailureWire")]
pub struct DaemonFailure {
    /// Failure description
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DaemonFailureWire {
    Bare(String),
    Object { message: String },
}

impl From<DaemonFailureWire> for DaemonFailure {
    fn from(wire: DaemonFailureWire) -> Self {
        match wire {
            DaemonFailureWire::Bare(message) | DaemonFailureWire::Object { message } => {
                Self { message }
            }
        }
    }
}

/// Arguments of the `send_file` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFileArgs {
    /// Target peer, addressed by name
    pub peer_name: String,
    /// Local path of the file to send
    pub file_path: String,
}
