//! Daemon readiness state machine for airdrop.
//!
//! This module provides a pure, side-effect-free state machine for the
//! startup handshake. It takes readiness signals as input and produces a new
//! state plus a list of effects to execute.
//!
//! The signals come from three racing sources (an active probe, the
//! `daemon-ready` push and the `daemon-error` push) plus a local timeout.
//! The machine only ever moves forward, so delivering a signal twice or
//! out of order cannot regress the status.

use serde::Serialize;

use crate::SessionError;

/// Daemon status as seen by the client. Exactly one is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum DaemonStatus {
    /// Waiting for the first terminal signal.
    Initializing,
    /// The daemon is usable.
    Ready,
    /// Startup failed or timed out.
    Error(SessionError),
}

/// Readiness state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    status: DaemonStatus,
    /// Set on the first `Ready`; blocks later errors from regressing status.
    ready_observed: bool,
}

/// Inputs to the readiness machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Teardown: forget everything and wait again.
    Reset,
    /// Probe answered `true` or `daemon-ready` was pushed.
    Ready,
    /// `daemon-error` was pushed.
    Failed(String),
    /// The readiness events could not be subscribed.
    Unreachable(String),
    /// The readiness timeout expired.
    TimedOut,
}

/// Effects to be executed by the client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Cancel the pending readiness timeout.
    CancelTimeout,
    /// Fetch the local device identity.
    FetchDeviceInfo,
}

impl Readiness {
    /// Create a new state machine in the Initializing state.
    pub fn new() -> Self {
        Self {
            status: DaemonStatus::Initializing,
            ready_observed: false,
        }
    }

    /// Process a signal and return the new state plus effects to execute.
    ///
    /// This is a pure function - no side effects. The caller is responsible
    /// for executing the returned effects.
    pub fn on_signal(self, signal: Signal) -> (Self, Vec<Effect>) {
        match (self, signal) {
            (_, Signal::Reset) => (Self::new(), vec![]),

            // Once ready, nothing moves the status again.
            (state, _) if state.ready_observed => (state, vec![]),

            // First Ready wins, and may supersede an earlier error once.
            (
                Self {
                    status: DaemonStatus::Initializing | DaemonStatus::Error(_),
                    ..
                },
                Signal::Ready,
            ) => (
                Self {
                    status: DaemonStatus::Ready,
                    ready_observed: true,
                },
                vec![Effect::CancelTimeout, Effect::FetchDeviceInfo],
            ),

            (
                Self {
                    status: DaemonStatus::Initializing,
                    ..
                },
                Signal::Failed(message),
            ) => (
                Self {
                    status: DaemonStatus::Error(SessionError::DaemonReportedError(message)),
                    ready_observed: false,
                },
                vec![Effect::CancelTimeout],
            ),

            // The probe may still answer, so the timeout stays armed.
            (
                Self {
                    status: DaemonStatus::Initializing,
                    ..
                },
                Signal::Unreachable(message),
            ) => (
                Self {
                    status: DaemonStatus::Error(SessionError::ChannelUnavailable(message)),
                    ready_observed: false,
                },
                vec![],
            ),

            (
                Self {
                    status: DaemonStatus::Initializing,
                    ..
                },
                Signal::TimedOut,
            ) => (
                Self {
                    status: DaemonStatus::Error(SessionError::InitializationTimeout),
                    ready_observed: false,
                },
                vec![],
            ),

            // First error is authoritative until Ready arrives
            (state, _) => (state, vec![]),
        }
    }

    /// Current status.
    pub fn status(&self) -> &DaemonStatus {
        &self.status
    }

    /// Whether `Ready` has been observed since the last reset.
    pub fn ready_observed(&self) -> bool {
        self.ready_observed
    }

    /// Check if the daemon is usable.
    pub fn is_ready(&self) -> bool {
        matches!(self.status, DaemonStatus::Ready)
    }

    /// Check if no terminal signal has arrived yet.
    pub fn is_initializing(&self) -> bool {
        matches!(self.status, DaemonStatus::Initializing)
    }

    /// The current error, if any.
    pub fn error(&self) -> Option<&SessionError> {
        match &self.status {
            DaemonStatus::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}
