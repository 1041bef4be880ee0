//! Error types for airdrop wire handling.

use thiserror::Error;

/// Errors that can occur while decoding daemon traffic.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A payload did not match the expected shape
    #[error("malformed {context} payload: {source}")]
    Payload {
        /// Call or event the payload belongs to.
        context: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload could not be encoded
    #[error("failed to encode {context} payload: {source}")]
    Encode {
        /// Call or event the payload belongs to.
        context: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Call name outside the daemon surface
    #[error("unknown call: {0}")]
    UnknownCall(String),

    /// Event name outside the daemon surface
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}
