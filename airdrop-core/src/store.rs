//! Application state store for airdrop.
//!
//! [`AppStore`] owns the single [`AppState`] of a session. Every mutation is
//! an [`Action`]; applying one is synchronous and total: it either fully
//! applies or is [`Rejected`] with no change at all. Invariants spanning
//! several slices (a removed peer clearing the selection) are enforced
//! inside the one action that could break them.

use std::path::PathBuf;

use airdrop_types::{DeviceInfo, Peer, PeerId};
use serde::Serialize;

use crate::{
    DaemonStatus, Effect, PeerSet, Readiness, Rejected, SessionError, Signal, TransferLedger,
    TransferRecord,
};

/// Everything a consumer can observe about a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    /// Daemon readiness
    pub readiness: Readiness,
    /// Local identity, known once the daemon is ready
    pub device_info: Option<DeviceInfo>,
    /// Where received files land, known once the daemon is ready
    pub download_dir: Option<PathBuf>,
    /// Live peers
    pub peers: PeerSet,
    /// Selected peer; always present in `peers` when set
    pub selected: Option<PeerId>,
    /// Last bulk listing failure, cleared by the next successful listing
    pub peer_error: Option<SessionError>,
    /// Presence events cannot be received; cleared only by a reset
    pub presence_error: Option<SessionError>,
    /// A bulk listing is in flight
    pub peers_loading: bool,
    /// Transfer history, newest first
    pub history: TransferLedger,
    /// Peer panel visibility
    pub sidebar_open: bool,
}

impl AppState {
    /// Initial state of a fresh session.
    pub fn new() -> Self {
        Self {
            readiness: Readiness::new(),
            device_info: None,
            download_dir: None,
            peers: PeerSet::new(),
            selected: None,
            peer_error: None,
            presence_error: None,
            peers_loading: false,
            history: TransferLedger::new(),
            sidebar_open: true,
        }
    }

    /// Current daemon status.
    pub fn status(&self) -> &DaemonStatus {
        self.readiness.status()
    }

    /// The selected peer, resolved against the peer set.
    pub fn selected_peer(&self) -> Option<&Peer> {
        self.selected.as_ref().and_then(|id| self.peers.get(id))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The enumerable set of state mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Feed the readiness machine.
    Readiness(Signal),
    /// Store the local device identity.
    SetDeviceInfo(DeviceInfo),
    /// Store the download directory.
    SetDownloadDir(PathBuf),
    /// A bulk listing was issued.
    BeginPeerListing,
    /// Upsert a bulk listing into the set.
    MergePeers(Vec<Peer>),
    /// Replace the set with a bulk listing (manual refresh).
    ReplacePeers(Vec<Peer>),
    /// A bulk listing failed.
    PeerListFailed(String),
    /// The presence events could not be subscribed.
    PresenceUnavailable(String),
    /// `peer-online`
    PeerOnline(Peer),
    /// `peer-offline`
    PeerOffline(PeerId),
    /// Select a peer, or clear the selection with `None`.
    SelectPeer(Option<PeerId>),
    /// Append to the transfer history.
    RecordTransfer(TransferRecord),
    /// Flip the peer panel.
    ToggleSidebar,
}

impl Action {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Readiness(_) => "readiness",
            Action::SetDeviceInfo(_) => "set_device_info",
            Action::SetDownloadDir(_) => "set_download_dir",
            Action::BeginPeerListing => "begin_peer_listing",
            Action::MergePeers(_) => "merge_peers",
            Action::ReplacePeers(_) => "replace_peers",
            Action::PeerListFailed(_) => "peer_list_failed",
            Action::PresenceUnavailable(_) => "presence_unavailable",
            Action::PeerOnline(_) => "peer_online",
            Action::PeerOffline(_) => "peer_offline",
            Action::SelectPeer(_) => "select_peer",
            Action::RecordTransfer(_) => "record_transfer",
            Action::ToggleSidebar => "toggle_sidebar",
        }
    }
}

/// What applying an action did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The state differs from before.
    pub changed: bool,
    /// Readiness effects the caller must execute.
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn from_changed(changed: bool) -> Self {
        Self {
            changed,
            effects: vec![],
        }
    }
}

/// Owner of the session state. The only way to mutate it is [`AppStore::apply`].
#[derive(Debug, Clone, Default)]
pub struct AppStore {
    state: AppState,
}

impl AppStore {
    /// Create a store holding a fresh state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.state.clone()
    }

    /// Apply one action.
    ///
    /// Validation happens before any field is touched, so a rejected action
    /// leaves the state exactly as it was.
    pub fn apply(&mut self, action: Action) -> Result<Outcome, Rejected> {
        let state = &mut self.state;
        let outcome = match action {
            Action::Readiness(signal) => {
                let reset = signal == Signal::Reset;
                let before = state.readiness.clone();
                let (next, effects) = before.clone().on_signal(signal);
                let mut changed = next != before;
                state.readiness = next;
                if reset {
                    changed |= state.device_info.take().is_some();
                    changed |= state.download_dir.take().is_some();
                    changed |= state.presence_error.take().is_some();
                }
                Outcome { changed, effects }
            }

            Action::SetDeviceInfo(info) => {
                let changed = state.device_info.as_ref() != Some(&info);
                state.device_info = Some(info);
                Outcome::from_changed(changed)
            }

            Action::SetDownloadDir(dir) => {
                let changed = state.download_dir.as_ref() != Some(&dir);
                state.download_dir = Some(dir);
                Outcome::from_changed(changed)
            }

            Action::BeginPeerListing => {
                let changed = !state.peers_loading;
                state.peers_loading = true;
                Outcome::from_changed(changed)
            }

            Action::MergePeers(snapshot) => {
                let added = state.peers.merge(snapshot);
                let changed = added > 0 || state.peers_loading || state.peer_error.is_some();
                state.peers_loading = false;
                state.peer_error = None;
                Outcome::from_changed(changed)
            }

            Action::ReplacePeers(snapshot) => {
                let before = state.peers.clone();
                state.peers.replace(snapshot);
                let selection_dropped = clear_dangling_selection(state);
                let changed = before != state.peers
                    || selection_dropped
                    || state.peers_loading
                    || state.peer_error.is_some();
                state.peers_loading = false;
                state.peer_error = None;
                Outcome::from_changed(changed)
            }

            Action::PeerListFailed(message) => {
                state.peers_loading = false;
                state.peer_error = Some(SessionError::BulkListFailure(message));
                Outcome::from_changed(true)
            }

            Action::PresenceUnavailable(message) => {
                let error = SessionError::ChannelUnavailable(message);
                let changed = state.presence_error.as_ref() != Some(&error);
                state.presence_error = Some(error);
                Outcome::from_changed(changed)
            }

            Action::PeerOnline(peer) => Outcome::from_changed(state.peers.upsert(peer)),

            Action::PeerOffline(id) => {
                let removed = state.peers.remove(&id).is_some();
                if removed {
                    clear_dangling_selection(state);
                }
                Outcome::from_changed(removed)
            }

            Action::SelectPeer(Some(id)) => {
                if !state.peers.contains(&id) {
                    return Err(Rejected::UnknownPeer(id));
                }
                let changed = state.selected.as_ref() != Some(&id);
                state.selected = Some(id);
                Outcome::from_changed(changed)
            }

            Action::SelectPeer(None) => Outcome::from_changed(state.selected.take().is_some()),

            Action::RecordTransfer(record) => {
                if state.history.contains(&record.id) {
                    return Err(Rejected::DuplicateTransfer(record.id));
                }
                state.history.append(record);
                Outcome::from_changed(true)
            }

            Action::ToggleSidebar => {
                state.sidebar_open = !state.sidebar_open;
                Outcome::from_changed(true)
            }
        };
        Ok(outcome)
    }
}

/// Clear the selection if it no longer resolves. Returns true if cleared.
fn clear_dangling_selection(state: &mut AppState) -> bool {
    match &state.selected {
        Some(id) if !state.peers.contains(id) => {
            state.selected = None;
            true
        }
        _ => false,
    }
}
