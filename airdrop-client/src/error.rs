//! Error types for the airdrop session surface.

use airdrop_core::{Rejected, SessionError};
use thiserror::Error;

use crate::channel::ChannelError;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level failure, as stored in state.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The store refused the action.
    #[error("rejected: {0}")]
    Rejected(#[from] Rejected),

    /// The session task is gone.
    #[error("session closed")]
    SessionClosed,
}
