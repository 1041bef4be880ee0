//! # airdrop-core
//!
//! Pure session state for airdrop (no I/O, instant tests).
//!
//! This crate implements the reconciliation rules between the daemon's push
//! streams and the client-visible state, without any channel or timer.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about interleavings, since every rule is idempotent
//!
//! The actual I/O (daemon calls, subscriptions, timeouts) is performed by
//! `airdrop-client`, which feeds [`Action`]s into an [`AppStore`] and
//! interprets the returned [`Effect`]s.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ledger;
pub mod peers;
pub mod readiness;
pub mod store;

pub use error::{Rejected, SessionError};
pub use ledger::{
    file_name_of, Direction, TransferLedger, TransferRecord, TransferStatus, HISTORY_CAPACITY,
    UNKNOWN_FILE_NAME,
};
pub use peers::PeerSet;
pub use readiness::{DaemonStatus, Effect, Readiness, Signal};
pub use store::{Action, AppState, AppStore, Outcome};
