//! # airdrop-types
//!
//! Wire types for the airdrop daemon surface.
//!
//! This crate provides the foundational types shared by every airdrop crate:
//! - [`PeerId`], [`TransferId`] - Identity types
//! - [`Peer`], [`DeviceInfo`] and the push payloads - Wire entities
//! - [`Call`], [`EventKind`], [`DaemonEvent`] - Names and typed decoding
//! - [`DecodeError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod messages;
mod protocol;

pub use error::DecodeError;
pub use ids::{PeerId, TransferId};
pub use messages::{
    DaemonFailure, DaemonReady, DeviceInfo, FileReceived, Peer, PeerOffline, ReceiveError,
    SendFileArgs,
};
pub use protocol::{Call, DaemonEvent, EventKind, PushEvent};
