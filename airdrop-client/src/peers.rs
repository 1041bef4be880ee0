//! Peer set synchronizer.
//!
//! Combines bulk `list_peers` answers with `peer-online` / `peer-offline`
//! pushes. Presence arrives on a single subscription so an online followed
//! by an offline for the same peer is never seen the other way round.
//! Listings and presence are not ordered relative to each other, so a
//! listing at activation is merged into whatever events already delivered,
//! while a manual refresh replaces the set outright.

use airdrop_core::Action;
use airdrop_types::{DaemonEvent, EventKind, Peer, PeerId};

use crate::api::{next_event, DaemonApi, EventStream};
use crate::channel::{ChannelError, DaemonChannel};
use crate::tasks::Completions;

/// Presence pushes, subscribed as one group so their order is kept.
const PRESENCE_EVENTS: [EventKind; 2] = [EventKind::PeerOnline, EventKind::PeerOffline];

/// How a bulk listing is folded into the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Upsert into the existing set (activation).
    Merge,
    /// Replace the set wholesale (manual refresh).
    Replace,
}

/// Everything that can reach the synchronizer.
#[derive(Debug)]
pub enum PeerInput {
    /// `peer-online` was pushed.
    Online(Peer),
    /// `peer-offline` was pushed.
    Offline(PeerId),
    /// A bulk listing answered.
    Listing {
        /// Mode the listing was requested in
        mode: ListMode,
        /// The answer
        result: Result<Vec<Peer>, ChannelError>,
    },
}

/// Keeps the peer slice in step with the daemon.
pub struct PeerSynchronizer<C> {
    api: DaemonApi<C>,
    presence: Option<EventStream>,
    tasks: Completions<PeerInput>,
}

impl<C: DaemonChannel> PeerSynchronizer<C> {
    /// Create an inactive synchronizer.
    pub fn new(api: DaemonApi<C>) -> Self {
        Self {
            api,
            presence: None,
            tasks: Completions::new(),
        }
    }

    /// Subscribe to presence events and request the initial listing.
    ///
    /// A failed subscription is reported as [`Action::PresenceUnavailable`],
    /// which outlives the listing that follows it.
    pub async fn activate(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        match self.api.subscribe(&PRESENCE_EVENTS).await {
            Ok(stream) => self.presence = Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to subscribe to presence events");
                actions.push(Action::PresenceUnavailable(e.into_message()));
            }
        }

        actions.push(self.request(ListMode::Merge));
        actions
    }

    /// Request a listing that replaces the set.
    pub fn refresh(&mut self) -> Action {
        self.request(ListMode::Replace)
    }

    fn request(&mut self, mode: ListMode) -> Action {
        tracing::debug!(?mode, "Requesting peer listing");
        let api = self.api.clone();
        self.tasks.spawn(async move {
            PeerInput::Listing {
                mode,
                result: api.list_peers().await,
            }
        });
        Action::BeginPeerListing
    }

    /// Drop subscriptions and discard in-flight listings.
    pub fn teardown(&mut self) {
        tracing::debug!(in_flight = self.tasks.in_flight(), "Peer synchronizer teardown");
        self.presence = None;
        self.tasks.cancel_all();
    }

    /// Wait for the next input. Cancel safe.
    pub async fn next_input(&mut self) -> PeerInput {
        loop {
            tokio::select! {
                event = next_event(&mut self.presence) => match event {
                    DaemonEvent::PeerOnline(peer) => return PeerInput::Online(peer),
                    DaemonEvent::PeerOffline(gone) => return PeerInput::Offline(gone.id),
                    other => tracing::debug!(event = %other.kind(), "Ignoring unrelated event"),
                },
                input = self.tasks.next() => return input,
            }
        }
    }

    /// Translate an input into a store action.
    pub fn interpret(&self, input: PeerInput) -> Action {
        match input {
            PeerInput::Online(peer) => {
                tracing::debug!(peer = %peer.id, name = %peer.name, "peer-online");
                Action::PeerOnline(peer)
            }
            PeerInput::Offline(id) => {
                tracing::debug!(peer = %id, "peer-offline");
                Action::PeerOffline(id)
            }
            PeerInput::Listing {
                mode,
                result: Ok(peers),
            } => {
                tracing::debug!(?mode, count = peers.len(), "Peer listing received");
                match mode {
                    ListMode::Merge => Action::MergePeers(peers),
                    ListMode::Replace => Action::ReplacePeers(peers),
                }
            }
            PeerInput::Listing { result: Err(e), .. } => {
                tracing::warn!(error = %e, "Peer listing failed");
                Action::PeerListFailed(e.into_message())
            }
        }
    }
}
