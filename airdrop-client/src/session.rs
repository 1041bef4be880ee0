//! Session - the main interface for airdrop.
//!
//! This module provides [`Session::start`], which spawns the session task,
//! and [`SessionHandle`], the surface applications use to read state and
//! issue user actions.
//!
//! # Architecture
//!
//! The session task is the only mutator of the [`AppStore`]. It multiplexes
//! one queue per source with `tokio::select!` and applies one action at a
//! time:
//!
//! ```text
//! SessionHandle ──commands──┐
//! ReadinessCoordinator ─────┤
//! PeerSynchronizer ─────────┼──> session task ──> AppStore ──watch──> consumers
//! TransferIntake ───────────┘
//! ```
//!
//! Daemon calls never run inside the loop; they are spawned and report back
//! through the components' completion queues.

use std::sync::Arc;

use airdrop_core::{Action, AppState, AppStore, Rejected, Signal, SessionError, TransferRecord};
use airdrop_types::PeerId;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};

use crate::api::DaemonApi;
use crate::channel::DaemonChannel;
use crate::config::SessionConfig;
use crate::error::ClientError;
use crate::peers::PeerSynchronizer;
use crate::readiness::ReadinessCoordinator;
use crate::transfers::TransferIntake;

/// Command queue depth.
const COMMAND_BUFFER: usize = 32;

/// User actions sent from handles to the session task.
#[derive(Debug)]
enum Command {
    SelectPeer {
        id: Option<PeerId>,
        reply: oneshot::Sender<Result<(), Rejected>>,
    },
    RefreshPeers,
    SendFile {
        peer_name: String,
        file_path: String,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    ToggleSidebar,
    Reinitialize {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Entry point for running a session.
pub struct Session;

impl Session {
    /// Activate every component against `channel` and spawn the session task.
    ///
    /// Subscriptions are attached before this returns, so events emitted
    /// afterwards are observed. Must be called within a tokio runtime.
    pub async fn start<C: DaemonChannel>(channel: C, config: SessionConfig) -> SessionHandle {
        let api = DaemonApi::new(Arc::new(channel));
        let store = AppStore::new();
        let (state_tx, state_rx) = watch::channel(store.snapshot());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let mut runtime = Runtime {
            store,
            readiness: ReadinessCoordinator::new(api.clone(), config),
            peers: PeerSynchronizer::new(api.clone()),
            transfers: TransferIntake::new(api.clone()),
            api,
            commands: command_rx,
            state_tx,
        };
        runtime.activate().await;
        tracing::info!("Session started");

        tokio::spawn(runtime.run());

        SessionHandle {
            commands: command_tx,
            state: state_rx,
        }
    }
}

/// Handle to a running session. Cheap to clone.
///
/// The session stops when [`SessionHandle::shutdown`] is called or the last
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<AppState>,
}

impl SessionHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn watch(&self) -> watch::Receiver<AppState> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `condition`.
    ///
    /// Checks the current state first. Fails if the session ends before
    /// the condition holds.
    pub async fn wait_until<F>(&self, condition: F) -> Result<AppState, ClientError>
    where
        F: FnMut(&AppState) -> bool,
    {
        let mut state = self.state.clone();
        let matched = state
            .wait_for(condition)
            .await
            .map_err(|_| ClientError::SessionClosed)?;
        Ok(AppState::clone(&matched))
    }

    /// Select a peer, or clear the selection with `None`.
    ///
    /// Selecting an id that is not in the peer set is rejected.
    pub async fn select_peer(&self, id: Option<PeerId>) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectPeer { id, reply }).await?;
        rx.await.map_err(|_| ClientError::SessionClosed)??;
        Ok(())
    }

    /// Request a listing that replaces the peer set.
    pub async fn refresh_peers(&self) -> Result<(), ClientError> {
        self.send(Command::RefreshPeers).await
    }

    /// Send a file to a peer.
    ///
    /// The history records the send as completed immediately. This resolves
    /// once the daemon accepted or refused it; a refusal is returned as
    /// [`SessionError::SendFailure`] and leaves the history untouched.
    pub async fn send_file(&self, peer_name: &str, file_path: &str) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SendFile {
            peer_name: peer_name.to_string(),
            file_path: file_path.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::SessionClosed)?
    }

    /// Flip the peer panel flag.
    pub async fn toggle_sidebar(&self) -> Result<(), ClientError> {
        self.send(Command::ToggleSidebar).await
    }

    /// Tear every component down and start the handshake again.
    ///
    /// Resolves once the new subscriptions are attached.
    pub async fn reinitialize(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reinitialize { reply }).await?;
        rx.await.map_err(|_| ClientError::SessionClosed)
    }

    /// Stop the session task. Resolves once everything is torn down.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| ClientError::SessionClosed)
    }

    async fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::SessionClosed)
    }
}

/// State owned by the session task.
struct Runtime<C> {
    store: AppStore,
    readiness: ReadinessCoordinator<C>,
    peers: PeerSynchronizer<C>,
    transfers: TransferIntake<C>,
    api: DaemonApi<C>,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<AppState>,
}

impl<C: DaemonChannel> Runtime<C> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.teardown();
                        self.commands.close();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.teardown();
                        break;
                    }
                },
                input = self.readiness.next_input() => {
                    if let Some(action) = self.readiness.interpret(input) {
                        let _ = self.dispatch(action);
                    }
                }
                input = self.peers.next_input() => {
                    let action = self.peers.interpret(input);
                    let _ = self.dispatch(action);
                }
                input = self.transfers.next_input() => {
                    let action = self.transfers.interpret(input, Utc::now());
                    let _ = self.dispatch(action);
                }
            }
        }
        tracing::info!("Session stopped");
    }

    async fn activate(&mut self) {
        for action in self.readiness.activate().await {
            let _ = self.dispatch(action);
        }
        for action in self.peers.activate().await {
            let _ = self.dispatch(action);
        }
        self.transfers.activate().await;
    }

    fn teardown(&mut self) {
        self.readiness.teardown();
        self.peers.teardown();
        self.transfers.teardown();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SelectPeer { id, reply } => {
                let result = self.dispatch(Action::SelectPeer(id));
                let _ = reply.send(result);
            }
            Command::RefreshPeers => {
                let action = self.peers.refresh();
                let _ = self.dispatch(action);
            }
            Command::SendFile {
                peer_name,
                file_path,
                reply,
            } => self.send_file(peer_name, file_path, reply),
            Command::ToggleSidebar => {
                let _ = self.dispatch(Action::ToggleSidebar);
            }
            Command::Reinitialize { reply } => {
                tracing::info!("Reinitializing session");
                self.teardown();
                let _ = self.dispatch(Action::Readiness(Signal::Reset));
                self.activate().await;
                let _ = reply.send(());
            }
            // Handled by the loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    /// Record the send optimistically, then hand it to the daemon.
    fn send_file(
        &mut self,
        peer_name: String,
        file_path: String,
        reply: oneshot::Sender<Result<(), ClientError>>,
    ) {
        let record = TransferRecord::outbound(&peer_name, &file_path, Utc::now());
        if let Err(e) = self.dispatch(Action::RecordTransfer(record)) {
            let _ = reply.send(Err(e.into()));
            return;
        }

        let api = self.api.clone();
        tokio::spawn(async move {
            let result = match api.send_file(&peer_name, &file_path).await {
                Ok(()) => {
                    tracing::info!(peer = %peer_name, file = %file_path, "File handed to daemon");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(peer = %peer_name, error = %e, "Send failed");
                    Err(ClientError::Session(SessionError::SendFailure(
                        e.into_message(),
                    )))
                }
            };
            let _ = reply.send(result);
        });
    }

    /// Apply one action and publish the new state if it changed.
    fn dispatch(&mut self, action: Action) -> Result<(), Rejected> {
        let label = action.label();
        match self.store.apply(action) {
            Ok(outcome) => {
                self.readiness.perform(&outcome.effects);
                if outcome.changed {
                    tracing::debug!(action = label, "State changed");
                    self.state_tx.send_replace(self.store.snapshot());
                }
                Ok(())
            }
            Err(rejected) => {
                tracing::warn!(action = label, reason = %rejected, "Action rejected");
                Err(rejected)
            }
        }
    }
}
