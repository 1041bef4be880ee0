//! Session-level tests against the in-process mock daemon.

use std::path::PathBuf;
use std::time::Duration;

use airdrop_client::{
    ClientError, DaemonStatus, MockDaemon, Session, SessionConfig, SessionError, SessionHandle,
};
use airdrop_core::{AppState, Direction, Rejected, TransferStatus};
use airdrop_types::{Call, EventKind, PeerId};
use serde_json::{json, Value};

fn peer(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "addr": format!("10.0.0.{}", name.len())})
}

fn ids(state: &AppState) -> Vec<String> {
    state.peers.iter().map(|p| p.id.to_string()).collect()
}

async fn start(daemon: &MockDaemon) -> SessionHandle {
    Session::start(daemon.clone(), SessionConfig::default()).await
}

/// Let every spawned task run to idle. Requires paused time.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ===========================================
// Readiness
// ===========================================

#[tokio::test(start_paused = true)]
async fn silent_daemon_times_out_with_actionable_error() {
    let daemon = MockDaemon::new()
        .with_response(Call::CheckDaemonReady, json!(false))
        .with_response(Call::ListPeers, json!([]));
    let session = start(&daemon).await;

    let state = session
        .wait_until(|s| !s.readiness.is_initializing())
        .await
        .unwrap();

    assert_eq!(
        state.status(),
        &DaemonStatus::Error(SessionError::InitializationTimeout)
    );
    let message = state.readiness.error().unwrap().to_string();
    assert!(message.contains("port"));
}

#[tokio::test(start_paused = true)]
async fn timeout_honours_configuration() {
    let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
    let config = SessionConfig::default().with_readiness_timeout(Duration::from_secs(2));
    let started = tokio::time::Instant::now();
    let session = Session::start(daemon, config).await;

    session
        .wait_until(|s| s.readiness.error().is_some())
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn probe_success_fetches_identity_once() {
    let daemon = MockDaemon::new()
        .with_response(Call::CheckDaemonReady, json!(true))
        .with_response(Call::GetDeviceInfo, json!({"name": "laptop", "port": 5001}))
        .with_response(Call::GetDownloadDir, json!("/home/me/Downloads"))
        .with_response(Call::ListPeers, json!([]));
    let session = start(&daemon).await;

    let state = session
        .wait_until(|s| s.device_info.is_some() && s.download_dir.is_some())
        .await
        .unwrap();
    assert_eq!(state.status(), &DaemonStatus::Ready);
    assert_eq!(state.device_info.unwrap().port, 5001);
    assert_eq!(state.download_dir, Some(PathBuf::from("/home/me/Downloads")));

    // A late push neither regresses nor refetches
    daemon.emit(EventKind::DaemonReady, Value::Null);
    daemon.emit(EventKind::DaemonError, json!({"message": "late"}));
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(session.snapshot().status(), &DaemonStatus::Ready);
    assert_eq!(daemon.call_count(Call::GetDeviceInfo), 1);
}

#[tokio::test(start_paused = true)]
async fn pushed_ready_wins_when_probe_says_not_yet() {
    let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
    let session = start(&daemon).await;
    settle().await;
    assert_eq!(session.snapshot().status(), &DaemonStatus::Initializing);

    daemon.emit(EventKind::DaemonReady, Value::Null);

    let state = session.wait_until(|s| s.readiness.is_ready()).await.unwrap();
    assert!(state.readiness.ready_observed());
}

#[tokio::test(start_paused = true)]
async fn error_then_ready_then_error_stays_ready() {
    let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
    let session = start(&daemon).await;

    daemon.emit(EventKind::DaemonError, json!("port 5001 in use"));
    let state = session
        .wait_until(|s| s.readiness.error().is_some())
        .await
        .unwrap();
    assert_eq!(
        state.readiness.error(),
        Some(&SessionError::DaemonReportedError("port 5001 in use".into()))
    );

    daemon.emit(EventKind::DaemonReady, Value::Null);
    session.wait_until(|s| s.readiness.is_ready()).await.unwrap();

    daemon.emit(EventKind::DaemonError, json!({"message": "late failure"}));
    settle().await;
    assert_eq!(session.snapshot().status(), &DaemonStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn first_error_wins() {
    let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
    let session = start(&daemon).await;

    daemon.emit(EventKind::DaemonError, json!("first"));
    session
        .wait_until(|s| s.readiness.error().is_some())
        .await
        .unwrap();
    daemon.emit(EventKind::DaemonError, json!("second"));
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(
        session.snapshot().readiness.error(),
        Some(&SessionError::DaemonReportedError("first".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn unreachable_readiness_channel_is_not_a_daemon_error() {
    let daemon = MockDaemon::new().with_response(Call::CheckDaemonReady, json!(false));
    daemon.fail_next_subscribe(EventKind::DaemonReady, "bridge unavailable");
    let session = start(&daemon).await;

    let state = session
        .wait_until(|s| s.readiness.error().is_some())
        .await
        .unwrap();

    let message = state.readiness.error().unwrap().to_string();
    assert_eq!(message, "daemon channel unavailable: bridge unavailable");
    assert!(!message.starts_with("daemon error"));
    assert_eq!(daemon.subscriber_count(EventKind::DaemonError), 0);
}

// ===========================================
// Re-initialization
// ===========================================

#[tokio::test(start_paused = true)]
async fn reinitialize_does_not_duplicate_subscriptions() {
    let daemon = MockDaemon::new()
        .with_response(Call::CheckDaemonReady, json!(true))
        .with_response(Call::GetDeviceInfo, json!({"name": "laptop", "port": 5001}))
        .with_response(Call::GetDownloadDir, json!("/tmp"))
        .with_response(Call::ListPeers, json!([]));
    let session = start(&daemon).await;
    session.wait_until(|s| s.device_info.is_some()).await.unwrap();

    session.reinitialize().await.unwrap();
    settle().await;
    session.reinitialize().await.unwrap();
    settle().await;

    for event in EventKind::ALL {
        assert_eq!(daemon.subscriber_count(event), 1, "{}", event);
    }
    session.wait_until(|s| s.device_info.is_some()).await.unwrap();
    assert_eq!(daemon.call_count(Call::CheckDaemonReady), 3);
}

#[tokio::test(start_paused = true)]
async fn probe_from_torn_down_activation_is_discarded() {
    let daemon = MockDaemon::new();
    let stale_probe = daemon.defer_next(Call::CheckDaemonReady);
    let session = start(&daemon).await;
    settle().await;
    assert_eq!(daemon.call_count(Call::CheckDaemonReady), 1);

    session.reinitialize().await.unwrap();
    stale_probe.resolve(json!(true));
    settle().await;

    assert_eq!(session.snapshot().status(), &DaemonStatus::Initializing);
}

#[tokio::test]
async fn shutdown_detaches_everything() {
    let daemon = MockDaemon::new();
    let session = start(&daemon).await;

    session.shutdown().await.unwrap();

    for event in EventKind::ALL {
        assert_eq!(daemon.subscriber_count(event), 0, "{}", event);
    }
    assert!(matches!(
        session.refresh_peers().await,
        Err(ClientError::SessionClosed)
    ));
}

// ===========================================
// Peers
// ===========================================

#[tokio::test]
async fn online_event_racing_the_listing_is_kept() {
    let daemon = MockDaemon::new();
    let listing = daemon.defer_next(Call::ListPeers);
    let session = start(&daemon).await;
    assert!(session.snapshot().peers_loading);

    daemon.emit(EventKind::PeerOnline, peer("c", "Tablet"));
    session.wait_until(|s| s.peers.len() == 1).await.unwrap();

    listing.resolve(json!([peer("a", "Phone"), peer("b", "Laptop")]));
    let state = session
        .wait_until(|s| !s.peers_loading)
        .await
        .unwrap();

    assert_eq!(ids(&state), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn duplicate_online_after_listing_keeps_one_entry() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    let session = start(&daemon).await;
    session.wait_until(|s| s.peers.len() == 1).await.unwrap();

    daemon.emit(EventKind::PeerOnline, peer("a", "Phone"));
    daemon.emit(EventKind::PeerOnline, peer("d", "Watch"));
    let state = session.wait_until(|s| s.peers.len() == 2).await.unwrap();

    assert_eq!(ids(&state), vec!["a", "d"]);
}

#[tokio::test]
async fn manual_refresh_replaces_the_set() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    let session = start(&daemon).await;
    session
        .wait_until(|s| !s.peers_loading && s.peers.len() == 1)
        .await
        .unwrap();

    daemon.emit(EventKind::PeerOnline, peer("c", "Tablet"));
    session.wait_until(|s| s.peers.len() == 2).await.unwrap();

    session.refresh_peers().await.unwrap();
    let state = session
        .wait_until(|s| !s.peers_loading && s.peers.len() == 1)
        .await
        .unwrap();

    assert_eq!(ids(&state), vec!["a"]);
    assert_eq!(daemon.call_count(Call::ListPeers), 2);
}

#[tokio::test]
async fn listing_failure_is_slice_local_and_cleared_by_refresh() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    daemon.fail_next(Call::ListPeers, "daemon not initialized");
    let session = start(&daemon).await;

    let state = session
        .wait_until(|s| s.peer_error.is_some())
        .await
        .unwrap();
    assert!(!state.peers_loading);
    assert_eq!(
        state.peer_error,
        Some(SessionError::BulkListFailure("daemon not initialized".into()))
    );
    assert_eq!(state.status(), &DaemonStatus::Initializing);

    session.refresh_peers().await.unwrap();
    let state = session.wait_until(|s| s.peers.len() == 1).await.unwrap();
    assert_eq!(state.peer_error, None);
}

#[tokio::test]
async fn online_then_offline_pairs_leave_no_ghosts() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([]));
    let session = start(&daemon).await;
    session.wait_until(|s| !s.peers_loading).await.unwrap();

    for i in 0..200 {
        let id = format!("p{}", i);
        daemon.emit(EventKind::PeerOnline, peer(&id, "Phone"));
        daemon.emit(EventKind::PeerOffline, json!({"id": id}));
    }
    daemon.emit(EventKind::PeerOnline, peer("last", "Watch"));

    let state = session
        .wait_until(|s| s.peers.iter().any(|p| p.id.as_str() == "last"))
        .await
        .unwrap();
    assert_eq!(ids(&state), vec!["last"]);
}

#[tokio::test(start_paused = true)]
async fn presence_failure_survives_the_listing() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    daemon.fail_next_subscribe(EventKind::PeerOnline, "bridge unavailable");
    let session = start(&daemon).await;

    let state = session
        .wait_until(|s| !s.peers_loading && s.peers.len() == 1)
        .await
        .unwrap();
    assert_eq!(
        state.presence_error,
        Some(SessionError::ChannelUnavailable("bridge unavailable".into()))
    );
    assert_eq!(state.peer_error, None);
    assert_eq!(daemon.subscriber_count(EventKind::PeerOnline), 0);
    assert_eq!(daemon.subscriber_count(EventKind::PeerOffline), 0);

    session.refresh_peers().await.unwrap();
    settle().await;
    assert!(session.snapshot().presence_error.is_some());

    session.reinitialize().await.unwrap();
    settle().await;
    let state = session.snapshot();
    assert_eq!(state.presence_error, None);
    assert_eq!(daemon.subscriber_count(EventKind::PeerOnline), 1);
}

// ===========================================
// Selection
// ===========================================

#[tokio::test]
async fn offline_of_selected_peer_clears_selection() {
    let daemon = MockDaemon::new().with_response(
        Call::ListPeers,
        json!([peer("a", "Phone"), peer("b", "Laptop")]),
    );
    let session = start(&daemon).await;
    session.wait_until(|s| s.peers.len() == 2).await.unwrap();
    session.select_peer(Some(PeerId::new("a"))).await.unwrap();

    daemon.emit(EventKind::PeerOffline, json!({"id": "b"}));
    let state = session.wait_until(|s| s.peers.len() == 1).await.unwrap();
    assert_eq!(state.selected, Some(PeerId::new("a")));

    daemon.emit(EventKind::PeerOffline, json!({"id": "a"}));
    let state = session.wait_until(|s| s.peers.is_empty()).await.unwrap();
    assert_eq!(state.selected, None);
}

#[tokio::test]
async fn selecting_unknown_peer_is_rejected() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    let session = start(&daemon).await;
    session.wait_until(|s| s.peers.len() == 1).await.unwrap();

    let result = session.select_peer(Some(PeerId::new("ghost"))).await;

    assert!(matches!(
        result,
        Err(ClientError::Rejected(Rejected::UnknownPeer(_)))
    ));
    assert_eq!(session.snapshot().selected, None);
}

#[tokio::test]
async fn refresh_dropping_selected_peer_clears_selection() {
    let daemon = MockDaemon::new().with_response(Call::ListPeers, json!([peer("a", "Phone")]));
    let session = start(&daemon).await;
    session.wait_until(|s| s.peers.len() == 1).await.unwrap();
    daemon.emit(EventKind::PeerOnline, peer("c", "Tablet"));
    session.wait_until(|s| s.peers.len() == 2).await.unwrap();
    session.select_peer(Some(PeerId::new("c"))).await.unwrap();

    session.refresh_peers().await.unwrap();
    let state = session
        .wait_until(|s| !s.peers_loading && s.peers.len() == 1)
        .await
        .unwrap();

    assert_eq!(state.selected, None);
}

// ===========================================
// Transfers
// ===========================================

#[tokio::test]
async fn send_is_recorded_optimistically() {
    let daemon = MockDaemon::new().with_response(Call::SendFile, Value::Null);
    let session = start(&daemon).await;

    session.send_file("b", "/tmp/photo.png").await.unwrap();

    let state = session.snapshot();
    let newest = state.history.newest().unwrap();
    assert_eq!(newest.direction, Direction::Sent);
    assert_eq!(newest.status, TransferStatus::Completed);
    assert_eq!(newest.file_name, "photo.png");
    assert_eq!(newest.peer_name, "b");
    assert_eq!(
        daemon.last_args(Call::SendFile),
        Some(json!({"peerName": "b", "filePath": "/tmp/photo.png"}))
    );
}

#[tokio::test]
async fn send_failure_reaches_caller_not_history() {
    let daemon = MockDaemon::new();
    daemon.fail_next(Call::SendFile, "peer unreachable");
    let session = start(&daemon).await;

    let result = session.send_file("b", "C:\\Users\\me\\report.pdf").await;

    match result {
        Err(ClientError::Session(SessionError::SendFailure(message))) => {
            assert_eq!(message, "peer unreachable")
        }
        other => panic!("expected a send failure, got {:?}", other),
    }
    let state = session.snapshot();
    assert_eq!(state.history.len(), 1);
    let newest = state.history.newest().unwrap();
    assert_eq!(newest.file_name, "report.pdf");
    assert!(!newest.is_failed());
}

#[tokio::test]
async fn inbound_events_are_recorded_newest_first() {
    let daemon = MockDaemon::new();
    let session = start(&daemon).await;

    daemon.emit(
        EventKind::FileReceived,
        json!({
            "from": "192.168.1.20:5001",
            "fileName": "report.pdf",
            "file": "/home/me/Downloads/report.pdf",
            "size": 48213,
            "timestamp": "2024-05-01T10:00:00Z"
        }),
    );
    session.wait_until(|s| s.history.len() == 1).await.unwrap();

    daemon.emit(
        EventKind::ReceiveError,
        json!({"from": "unknown", "error": "connection reset"}),
    );
    let state = session.wait_until(|s| s.history.len() == 2).await.unwrap();

    let records: Vec<_> = state.history.iter().collect();
    assert!(records[0].is_failed());
    assert_eq!(records[0].file_name, "unknown file");
    assert_eq!(records[1].file_name, "report.pdf");
    assert_eq!(records[1].size_bytes, 48213);
    assert!(records.iter().all(|r| r.direction == Direction::Received));
}

#[tokio::test]
async fn back_to_back_inbound_events_keep_their_order() {
    let daemon = MockDaemon::new();
    let session = start(&daemon).await;

    daemon.emit(
        EventKind::FileReceived,
        json!({
            "from": "192.168.1.20:5001",
            "fileName": "first.txt",
            "file": "/tmp/first.txt",
            "size": 1,
            "timestamp": "2024-05-01T10:00:00Z"
        }),
    );
    daemon.emit(
        EventKind::ReceiveError,
        json!({"from": "192.168.1.20:5001", "error": "disk full"}),
    );

    let state = session.wait_until(|s| s.history.len() == 2).await.unwrap();
    let records: Vec<_> = state.history.iter().collect();
    assert!(records[0].is_failed());
    assert_eq!(records[1].file_name, "first.txt");
}

#[tokio::test]
async fn malformed_event_does_not_break_the_stream() {
    let daemon = MockDaemon::new();
    let session = start(&daemon).await;

    daemon.emit(EventKind::FileReceived, json!({"from": "x"}));
    daemon.emit(
        EventKind::ReceiveError,
        json!({"from": "unknown", "error": "disk full"}),
    );
    daemon.emit(EventKind::ReceiveError, json!(42));
    daemon.emit(
        EventKind::ReceiveError,
        json!({"from": "unknown", "error": "disk full again"}),
    );

    let state = session.wait_until(|s| s.history.len() == 2).await.unwrap();
    assert!(state.history.iter().all(|r| r.is_failed()));
}

// ===========================================
// UI flags
// ===========================================

#[tokio::test]
async fn watchers_see_sidebar_changes() {
    let daemon = MockDaemon::new();
    let session = start(&daemon).await;
    let mut watcher = session.watch();
    assert!(watcher.borrow().sidebar_open);

    session.toggle_sidebar().await.unwrap();
    let state = watcher.wait_for(|s| !s.sidebar_open).await.unwrap();

    assert!(!state.sidebar_open);
}
