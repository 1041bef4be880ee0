//! Readiness coordinator.
//!
//! Drives the daemon startup handshake. On activation it arms the readiness
//! timeout, subscribes to `daemon-ready` / `daemon-error` and spawns an
//! active probe, because the push may already have fired before anyone was
//! listening. The status rules themselves live in
//! [`airdrop_core::Readiness`]; this module only gathers signals and
//! executes the effects the rules ask for.

use std::future::pending;
use std::path::PathBuf;
use std::pin::Pin;

use airdrop_core::{Action, Effect, Signal};
use airdrop_types::{DaemonEvent, DeviceInfo, EventKind};
use tokio::time::Sleep;

use crate::api::{next_event, DaemonApi, EventStream};
use crate::channel::{ChannelError, DaemonChannel};
use crate::config::SessionConfig;
use crate::tasks::Completions;

/// Readiness pushes, subscribed as one group so their order is kept.
const READINESS_EVENTS: [EventKind; 2] = [EventKind::DaemonReady, EventKind::DaemonError];

/// Everything that can reach the coordinator.
#[derive(Debug)]
pub enum ReadinessInput {
    /// `daemon-ready` was pushed.
    Ready,
    /// `daemon-error` was pushed.
    Failed(String),
    /// The readiness timeout expired.
    TimedOut,
    /// The active probe answered.
    Probe(Result<bool, ChannelError>),
    /// The device info fetch answered.
    DeviceInfo(Result<DeviceInfo, ChannelError>),
    /// The download directory fetch answered.
    DownloadDir(Result<PathBuf, ChannelError>),
}

/// Gathers readiness signals for one activation at a time.
pub struct ReadinessCoordinator<C> {
    api: DaemonApi<C>,
    config: SessionConfig,
    events: Option<EventStream>,
    timer: Option<Pin<Box<Sleep>>>,
    tasks: Completions<ReadinessInput>,
}

impl<C: DaemonChannel> ReadinessCoordinator<C> {
    /// Create an inactive coordinator.
    pub fn new(api: DaemonApi<C>, config: SessionConfig) -> Self {
        Self {
            api,
            config,
            events: None,
            timer: None,
            tasks: Completions::new(),
        }
    }

    /// Arm the timeout, subscribe and probe.
    ///
    /// Returns actions to apply right away. A failed subscription surfaces
    /// as an unreachable channel, not as a daemon error.
    pub async fn activate(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        let timeout = self.config.readiness_timeout();
        self.timer = Some(Box::pin(tokio::time::sleep(timeout)));
        tracing::debug!(timeout_ms = self.config.readiness_timeout_ms, "Readiness timeout armed");

        match self.api.subscribe(&READINESS_EVENTS).await {
            Ok(stream) => self.events = Some(stream),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to subscribe to readiness events");
                actions.push(Action::Readiness(Signal::Unreachable(e.into_message())));
            }
        }

        let api = self.api.clone();
        self.tasks
            .spawn(async move { ReadinessInput::Probe(api.check_daemon_ready().await) });

        actions
    }

    /// Drop subscriptions and the timer, and discard in-flight calls.
    pub fn teardown(&mut self) {
        tracing::debug!(in_flight = self.tasks.in_flight(), "Readiness teardown");
        self.events = None;
        self.timer = None;
        self.tasks.cancel_all();
    }

    /// Whether the readiness timeout is pending.
    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Wait for the next input. Cancel safe.
    pub async fn next_input(&mut self) -> ReadinessInput {
        loop {
            tokio::select! {
                event = next_event(&mut self.events) => match event {
                    DaemonEvent::DaemonReady => return ReadinessInput::Ready,
                    DaemonEvent::DaemonError(failure) => {
                        return ReadinessInput::Failed(failure.message)
                    }
                    other => tracing::debug!(event = %other.kind(), "Ignoring unrelated event"),
                },
                _ = expire(&mut self.timer) => return ReadinessInput::TimedOut,
                input = self.tasks.next() => return input,
            }
        }
    }

    /// Translate an input into a store action, if it warrants one.
    pub fn interpret(&self, input: ReadinessInput) -> Option<Action> {
        match input {
            ReadinessInput::Ready => {
                tracing::debug!("daemon-ready received");
                Some(Action::Readiness(Signal::Ready))
            }
            ReadinessInput::Failed(message) => {
                tracing::warn!(%message, "daemon-error received");
                Some(Action::Readiness(Signal::Failed(message)))
            }
            ReadinessInput::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.config.readiness_timeout_ms,
                    "Daemon did not report readiness in time"
                );
                Some(Action::Readiness(Signal::TimedOut))
            }
            ReadinessInput::Probe(Ok(true)) => {
                tracing::debug!("Readiness probe answered ready");
                Some(Action::Readiness(Signal::Ready))
            }
            ReadinessInput::Probe(Ok(false)) => {
                tracing::debug!("Readiness probe answered not ready");
                None
            }
            ReadinessInput::Probe(Err(e)) => {
                tracing::warn!(error = %e, "Readiness probe failed");
                None
            }
            ReadinessInput::DeviceInfo(Ok(info)) => {
                tracing::info!(name = %info.name, port = info.port, "Device info received");
                Some(Action::SetDeviceInfo(info))
            }
            ReadinessInput::DeviceInfo(Err(e)) => {
                tracing::warn!(error = %e, "Failed to fetch device info");
                None
            }
            ReadinessInput::DownloadDir(Ok(dir)) => Some(Action::SetDownloadDir(dir)),
            ReadinessInput::DownloadDir(Err(e)) => {
                tracing::warn!(error = %e, "Failed to fetch download directory");
                None
            }
        }
    }

    /// Execute effects returned by the readiness rules.
    pub fn perform(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::CancelTimeout => {
                    if self.timer.take().is_some() {
                        tracing::debug!("Readiness timeout cancelled");
                    }
                }
                Effect::FetchDeviceInfo => {
                    let api = self.api.clone();
                    self.tasks.spawn(async move {
                        ReadinessInput::DeviceInfo(api.get_device_info().await)
                    });
                    if self.config.fetch_download_dir {
                        let api = self.api.clone();
                        self.tasks.spawn(async move {
                            ReadinessInput::DownloadDir(api.get_download_dir().await)
                        });
                    }
                }
            }
        }
    }
}

/// Resolve once the timer fires, then disarm it. Pends while disarmed.
async fn expire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => {
            sleep.as_mut().await;
            *timer = None;
        }
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockDaemon;
    use airdrop_core::AppStore;
    use airdrop_types::{Call, EventKind};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn coordinator(daemon: &MockDaemon) -> ReadinessCoordinator<MockDaemon> {
        ReadinessCoordinator::new(
            DaemonApi::new(Arc::new(daemon.clone())),
            SessionConfig::default(),
        )
    }

    /// Feed inputs into a store until `done` holds.
    async fn drive(
        coord: &mut ReadinessCoordinator<MockDaemon>,
        store: &mut AppStore,
        done: impl Fn(&AppStore) -> bool,
    ) {
        while !done(store) {
            let input = coord.next_input().await;
            if let Some(action) = coord.interpret(input) {
                let outcome = store.apply(action).unwrap();
                coord.perform(&outcome.effects);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_success_cancels_timeout_and_fetches_identity() {
        let daemon = MockDaemon::new()
            .with_response(Call::CheckDaemonReady, json!(true))
            .with_response(Call::GetDeviceInfo, json!({"name": "laptop", "port": 5001}))
            .with_response(Call::GetDownloadDir, json!("/home/me/Downloads"));
        let mut coord = coordinator(&daemon);
        let mut store = AppStore::new();

        assert!(coord.activate().await.is_empty());
        assert!(coord.timer_armed());

        drive(&mut coord, &mut store, |s| {
            s.state().device_info.is_some() && s.state().download_dir.is_some()
        })
        .await;

        assert!(store.state().readiness.is_ready());
        assert!(!coord.timer_armed());
        assert_eq!(daemon.call_count(Call::GetDeviceInfo), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out() {
        let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
        let mut coord = coordinator(&daemon);
        let mut store = AppStore::new();
        coord.activate().await;

        drive(&mut coord, &mut store, |s| s.state().readiness.error().is_some()).await;

        assert_eq!(
            store.state().readiness.error(),
            Some(&airdrop_core::SessionError::InitializationTimeout)
        );
        assert!(!coord.timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn pushed_error_cancels_timeout() {
        let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
        let mut coord = coordinator(&daemon);
        let mut store = AppStore::new();
        coord.activate().await;

        daemon.emit(EventKind::DaemonError, json!({"message": "port 5001 in use"}));
        drive(&mut coord, &mut store, |s| s.state().readiness.error().is_some()).await;

        assert!(!coord.timer_armed());
    }

    #[tokio::test]
    async fn failed_subscription_surfaces_as_unreachable_channel() {
        let daemon = MockDaemon::new();
        daemon.fail_next_subscribe(EventKind::DaemonError, "bridge unavailable");
        let mut coord = coordinator(&daemon);
        let mut store = AppStore::new();

        let actions = coord.activate().await;
        assert_eq!(
            actions,
            vec![Action::Readiness(Signal::Unreachable("bridge unavailable".into()))]
        );

        for action in actions {
            store.apply(action).unwrap();
        }
        assert_eq!(
            store.state().readiness.error(),
            Some(&airdrop_core::SessionError::ChannelUnavailable(
                "bridge unavailable".into()
            ))
        );
        assert_eq!(daemon.subscriber_count(EventKind::DaemonReady), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_ready_keeps_push_order() {
        let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
        let mut coord = coordinator(&daemon);
        coord.activate().await;

        daemon.emit(EventKind::DaemonError, json!("port 5001 in use"));
        daemon.emit(EventKind::DaemonReady, Value::Null);

        let mut pushed = Vec::new();
        while pushed.len() < 2 {
            match coord.next_input().await {
                input @ (ReadinessInput::Ready | ReadinessInput::Failed(_)) => pushed.push(input),
                _ => {}
            }
        }
        assert!(matches!(pushed[0], ReadinessInput::Failed(_)));
        assert!(matches!(pushed[1], ReadinessInput::Ready));
    }

    #[tokio::test]
    async fn probe_answers_are_interpreted() {
        let daemon = MockDaemon::new();
        let mut coord = coordinator(&daemon);

        assert_eq!(
            coord.interpret(ReadinessInput::Probe(Ok(true))),
            Some(Action::Readiness(Signal::Ready))
        );
        assert_eq!(coord.interpret(ReadinessInput::Probe(Ok(false))), None);
        assert_eq!(
            coord.interpret(ReadinessInput::Probe(Err(ChannelError::Closed))),
            None
        );
    }

    #[tokio::test]
    async fn download_dir_fetch_can_be_disabled() {
        let daemon = MockDaemon::new();
        let mut coord = ReadinessCoordinator::new(
            DaemonApi::new(Arc::new(daemon.clone())),
            SessionConfig::default().with_fetch_download_dir(false),
        );

        coord.perform(&[Effect::FetchDeviceInfo]);
        let input = coord.next_input().await;

        assert!(matches!(input, ReadinessInput::DeviceInfo(Err(_))));
        assert_eq!(daemon.call_count(Call::GetDownloadDir), 0);
    }

    #[tokio::test]
    async fn teardown_detaches_everything() {
        let daemon = MockDaemon::new();
        let pending = daemon.defer_next(Call::CheckDaemonReady);
        let mut coord = coordinator(&daemon);
        coord.activate().await;
        assert_eq!(daemon.subscriber_count(EventKind::DaemonReady), 1);

        coord.teardown();
        pending.resolve(json!(true));

        assert!(!coord.timer_armed());
        assert_eq!(daemon.subscriber_count(EventKind::DaemonReady), 0);
        assert_eq!(daemon.subscriber_count(EventKind::DaemonError), 0);
        let result = tokio::time::timeout(Duration::from_millis(20), coord.next_input()).await;
        assert!(result.is_err(), "torn down coordinator must stay silent");
    }
}
