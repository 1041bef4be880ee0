//! Live peer set for airdrop.
//!
//! The set is fed by two unsynchronized sources: bulk listings and
//! `peer-online` / `peer-offline` events. Every operation here is idempotent
//! and keyed by [`PeerId`], so the set converges no matter how the sources
//! interleave or how often an event is redelivered.

use airdrop_types::{Peer, PeerId};
use serde::Serialize;

/// Ordered set of peers, unique by id.
///
/// Order is first-seen order, which keeps the daemon's listing order for
/// peers that arrive through a bulk listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PeerSet {
    peers: Vec<Peer>,
}

impl PeerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a listing. Later duplicates of an id are ignored.
    pub fn from_snapshot(snapshot: Vec<Peer>) -> Self {
        let mut set = Self::new();
        set.merge(snapshot);
        set
    }

    /// Insert a peer unless its id is already present.
    ///
    /// Returns true if the set changed. An already-present id is left
    /// untouched, including its name and address.
    pub fn upsert(&mut self, peer: Peer) -> bool {
        if self.contains(&peer.id) {
            return false;
        }
        self.peers.push(peer);
        true
    }

    /// Remove a peer by id, returning it if it was present.
    pub fn remove(&mut self, id: &PeerId) -> Option<Peer> {
        let index = self.peers.iter().position(|p| &p.id == id)?;
        Some(self.peers.remove(index))
    }

    /// Upsert every peer of a listing without dropping anything.
    ///
    /// Returns the number of peers added.
    pub fn merge(&mut self, snapshot: Vec<Peer>) -> usize {
        snapshot
            .into_iter()
            .fold(0, |added, peer| added + usize::from(self.upsert(peer)))
    }

    /// Replace the whole set with a listing.
    ///
    /// Returns the peers that were present before but are absent now.
    pub fn replace(&mut self, snapshot: Vec<Peer>) -> Vec<Peer> {
        let fresh = Self::from_snapshot(snapshot);
        let previous = std::mem::replace(self, fresh);
        previous
            .peers
            .into_iter()
            .filter(|p| !self.contains(&p.id))
            .collect()
    }

    /// Check whether a peer id is present.
    pub fn contains(&self, id: &PeerId) -> bool {
        self.get(id).is_some()
    }

    /// Look up a peer by id.
    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.iter().find(|p| &p.id == id)
    }

    /// Iterate peers in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }

    /// Peers as a slice.
    pub fn as_slice(&self) -> &[Peer] {
        &self.peers
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
