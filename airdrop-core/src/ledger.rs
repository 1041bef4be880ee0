//! Transfer history for airdrop.
//!
//! This module provides a bounded, append-only log of transfer attempts:
//! - Newest-first ordering, with the newest record readable in O(1)
//! - Strict insertion order; past records are never reordered or mutated
//! - A fixed capacity, evicting the oldest record on overflow
//!
//! Records come from two independent producers: optimistic local appends
//! when the user sends a file, and daemon-confirmed inbound transfers.

use std::collections::VecDeque;
use std::path::PathBuf;

use airdrop_types::{FileReceived, ReceiveError, TransferId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum number of records kept in the history.
pub const HISTORY_CAPACITY: usize = 100;

/// File name recorded when the daemon reports a receive failure.
pub const UNKNOWN_FILE_NAME: &str = "unknown file";

/// Direction of a transfer relative to this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Outbound, initiated locally.
    Sent,
    /// Inbound, reported by the daemon.
    Received,
}

/// Result of a transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TransferStatus {
    /// The transfer is considered done.
    Completed,
    /// The transfer failed.
    Failed {
        /// Failure description from the daemon.
        error: String,
    },
}

/// One transfer attempt. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    /// Locally minted identifier
    pub id: TransferId,
    /// Sent or received
    pub direction: Direction,
    /// Remote side, as named by the user or the daemon
    pub peer_name: String,
    /// Last path component of the file
    pub file_name: String,
    /// Full local path
    pub file_path: PathBuf,
    /// Size in bytes (0 when unknown)
    pub size_bytes: u64,
    /// When the record was produced
    pub timestamp: DateTime<Utc>,
    /// Outcome
    pub status: TransferStatus,
}

impl TransferRecord {
    /// Record for a send the user just initiated.
    ///
    /// Marked completed without waiting for the daemon. The size is not
    /// known to the client and is recorded as 0.
    pub fn outbound(peer_name: &str, file_path: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: TransferId::new(),
            direction: Direction::Sent,
            peer_name: peer_name.to_string(),
            file_name: file_name_of(file_path),
            file_path: PathBuf::from(file_path),
            size_bytes: 0,
            timestamp: now,
            status: TransferStatus::Completed,
        }
    }

    /// Record for a `file-received` event.
    pub fn received(event: FileReceived) -> Self {
        Self {
            id: TransferId::new(),
            direction: Direction::Received,
            peer_name: event.from,
            file_name: event.file_name,
            file_path: event.path,
            size_bytes: event.size,
            timestamp: event.timestamp,
            status: TransferStatus::Completed,
        }
    }

    /// Record for a `receive-error` event.
    pub fn receive_failed(event: ReceiveError, now: DateTime<Utc>) -> Self {
        Self {
            id: TransferId::new(),
            direction: Direction::Received,
            peer_name: event.from,
            file_name: UNKNOWN_FILE_NAME.to_string(),
            file_path: PathBuf::new(),
            size_bytes: 0,
            timestamp: now,
            status: TransferStatus::Failed { error: event.error },
        }
    }

    /// Check if the attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, TransferStatus::Failed { .. })
    }
}

/// Last component of a path, accepting both `/` and `\` separators.
///
/// Falls back to the whole input when the last component is empty.
pub fn file_name_of(path: &str) -> String {
    match path.rsplit(|c| c == '/' || c == '\\').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => path.to_string(),
    }
}

/// Bounded transfer history, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferLedger {
    /// Front is the newest record.
    records: VecDeque<TransferRecord>,
    capacity: usize,
}

impl TransferLedger {
    /// Create an empty ledger holding at most [`HISTORY_CAPACITY`] records.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty ledger with a custom capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a record at the head.
    ///
    /// Returns the evicted oldest record if the ledger was full.
    pub fn append(&mut self, record: TransferRecord) -> Option<TransferRecord> {
        let evicted = if self.records.len() >= self.capacity {
            self.records.pop_back()
        } else {
            None
        };
        self.records.push_front(record);
        evicted
    }

    /// The most recent record.
    pub fn newest(&self) -> Option<&TransferRecord> {
        self.records.front()
    }

    /// The oldest record still kept.
    pub fn oldest(&self) -> Option<&TransferRecord> {
        self.records.back()
    }

    /// Check whether a record id is present.
    pub fn contains(&self, id: &TransferId) -> bool {
        self.records.iter().any(|r| &r.id == id)
    }

    /// Iterate newest first.
    pub fn iter(&self) -> impl Iterator<Item = &TransferRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TransferLedger {
    fn default() -> Self {
        Self::new()
    }
}
