//! Inbound transfer intake.
//!
//! Turns `file-received` and `receive-error` pushes into history records,
//! in the order the daemon emitted them. Outbound sends are recorded by the
//! session itself when the user initiates them.

use airdrop_core::{Action, TransferRecord};
use airdrop_types::{DaemonEvent, EventKind, FileReceived, ReceiveError};
use chrono::{DateTime, Utc};

use crate::api::{next_event, DaemonApi, EventStream};
use crate::channel::DaemonChannel;

/// Inbound outcomes, subscribed as one group so history keeps their order.
const INBOUND_EVENTS: [EventKind; 2] = [EventKind::FileReceived, EventKind::ReceiveError];

/// Everything that can reach the intake.
#[derive(Debug)]
pub enum TransferInput {
    /// `file-received` was pushed.
    Received(FileReceived),
    /// `receive-error` was pushed.
    Failed(ReceiveError),
}

/// Listens for inbound transfer outcomes.
pub struct TransferIntake<C> {
    api: DaemonApi<C>,
    events: Option<EventStream>,
}

impl<C: DaemonChannel> TransferIntake<C> {
    /// Create an inactive intake.
    pub fn new(api: DaemonApi<C>) -> Self {
        Self { api, events: None }
    }

    /// Subscribe to inbound transfer events.
    ///
    /// A failed subscription is logged; the rest of the session carries on
    /// without inbound history.
    pub async fn activate(&mut self) {
        match self.api.subscribe(&INBOUND_EVENTS).await {
            Ok(stream) => self.events = Some(stream),
            Err(e) => tracing::error!(error = %e, "Failed to subscribe to inbound transfer events"),
        }
    }

    /// Drop subscriptions.
    pub fn teardown(&mut self) {
        self.events = None;
    }

    /// Wait for the next input. Cancel safe.
    pub async fn next_input(&mut self) -> TransferInput {
        loop {
            match next_event(&mut self.events).await {
                DaemonEvent::FileReceived(event) => return TransferInput::Received(event),
                DaemonEvent::ReceiveError(event) => return TransferInput::Failed(event),
                other => tracing::debug!(event = %other.kind(), "Ignoring unrelated event"),
            }
        }
    }

    /// Translate an input into a history append, stamped with `now` when
    /// the daemon gave no time.
    pub fn interpret(&self, input: TransferInput, now: DateTime<Utc>) -> Action {
        let record = match input {
            TransferInput::Received(event) => {
                tracing::info!(
                    from = %event.from,
                    file = %event.file_name,
                    size = event.size,
                    "File received"
                );
                TransferRecord::received(event)
            }
            TransferInput::Failed(event) => {
                tracing::warn!(from = %event.from, error = %event.error, "Inbound transfer failed");
                TransferRecord::receive_failed(event, now)
            }
        };
        Action::RecordTransfer(record)
    }
}
