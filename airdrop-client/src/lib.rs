//! # airdrop-client
//!
//! Session runtime for the airdrop daemon.
//!
//! This is the library a client application embeds to talk to the local
//! transfer daemon. It turns the daemon's call surface and its unreliable
//! push streams into one consistent, observable [`AppState`].
//!
//! ## Architecture
//!
//! ```text
//! Application → SessionHandle → session task → DaemonApi → DaemonChannel → daemon
//!                     ↑               ↓
//!              watch::Receiver   airdrop-core (pure store)
//! ```
//!
//! One task owns the [`AppStore`](airdrop_core::AppStore). The readiness
//! coordinator, the peer synchronizer and the transfer intake each feed it
//! from their own queues; the task applies one action at a time and
//! publishes a snapshot after every change.
//!
//! ## Example
//!
//! ```ignore
//! use airdrop_client::{MockDaemon, Session, SessionConfig};
//!
//! let daemon = MockDaemon::new();
//! let session = Session::start(daemon.clone(), SessionConfig::default()).await;
//!
//! let state = session.wait_until(|s| s.readiness.is_ready()).await?;
//! session.send_file("Phone", "/tmp/photo.png").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod peers;
pub mod readiness;
pub mod session;
mod tasks;
pub mod transfers;

pub use airdrop_core::{AppState, DaemonStatus, SessionError};
pub use api::{DaemonApi, EventStream};
pub use channel::{ChannelError, DaemonChannel, Delivery, MockDaemon, PendingCall, Subscription};
pub use config::SessionConfig;
pub use error::ClientError;
pub use peers::{ListMode, PeerInput, PeerSynchronizer};
pub use readiness::{ReadinessCoordinator, ReadinessInput};
pub use session::{Session, SessionHandle};
pub use transfers::{TransferInput, TransferIntake};
