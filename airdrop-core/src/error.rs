//! Error types for airdrop session state.

use airdrop_types::{PeerId, TransferId};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced to consumers of the session.
///
/// These are values, not exceptions: readiness and listing failures live in
/// state until the user retries.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum SessionError {
    /// The daemon never reported readiness
    #[error(
        "daemon did not become ready in time; the transfer port may already be in use, \
         try restarting the application"
    )]
    InitializationTimeout,

    /// The daemon reported a startup failure
    #[error("daemon error: {0}")]
    DaemonReportedError(String),

    /// The channel to the daemon refused a subscription
    #[error("daemon channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The bulk peer listing failed
    #[error("failed to list peers: {0}")]
    BulkListFailure(String),

    /// An outbound send was refused
    #[error("send failed: {0}")]
    SendFailure(String),

    /// An inbound transfer failed
    #[error("receive from {peer} failed: {message}")]
    ReceiveFailure {
        /// Failure description
        message: String,
        /// Sender, as the daemon named it
        peer: String,
    },
}

/// Reasons the store refuses an action. A rejected action changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    /// Selection must name a present peer
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// History records are inserted once
    #[error("transfer {0} already recorded")]
    DuplicateTransfer(TransferId),
}
