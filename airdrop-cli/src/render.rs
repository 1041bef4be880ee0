//! Text rendering of session state.

use airdrop_core::{AppState, DaemonStatus, Direction, TransferRecord, TransferStatus};
use chrono::{DateTime, Utc};

/// Short status label.
pub fn status_label(status: &DaemonStatus) -> String {
    match status {
        DaemonStatus::Initializing => "initializing".to_string(),
        DaemonStatus::Ready => "ready".to_string(),
        DaemonStatus::Error(err) => format!("error ({})", err),
    }
}

/// One-line summary of a state snapshot.
pub fn summary(state: &AppState) -> String {
    let peers: Vec<&str> = state.peers.iter().map(|p| p.id.as_str()).collect();
    let mut line = format!(
        "status={} peers={} [{}] selected={} history={} sidebar={}",
        status_label(state.status()),
        peers.len(),
        peers.join(","),
        state.selected.as_ref().map_or("-", |id| id.as_str()),
        state.history.len(),
        if state.sidebar_open { "open" } else { "closed" },
    );
    if state.peers_loading {
        line.push_str(" loading");
    }
    if let Some(err) = &state.peer_error {
        line.push_str(&format!(" peer_error=\"{}\"", err));
    }
    if let Some(err) = &state.presence_error {
        line.push_str(&format!(" presence_error=\"{}\"", err));
    }
    line
}

/// One history entry.
pub fn history_line(record: &TransferRecord, now: DateTime<Utc>) -> String {
    let (verb, arrow) = match record.direction {
        Direction::Sent => ("sent", "->"),
        Direction::Received => ("received", "<-"),
    };
    let outcome = match &record.status {
        TransferStatus::Completed => "completed".to_string(),
        TransferStatus::Failed { error } => format!("failed: {}", error),
    };
    format!(
        "{:<8} {} {} {} ({}, {}) {}",
        verb,
        record.file_name,
        arrow,
        record.peer_name,
        format_size(record.size_bytes),
        format_timestamp(record.timestamp, now),
        outcome,
    )
}

/// Format a byte count with a binary unit.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format a timestamp relative to `now`.
pub fn format_timestamp(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - ts).num_seconds().max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
