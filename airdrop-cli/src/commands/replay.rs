//! Replay a scripted daemon scenario against a live session.
//!
//! A scenario configures a [`MockDaemon`] (call responses and failures),
//! then runs a timeline of steps: push events, user actions and changes to
//! the daemon's behavior. Every state change the session publishes is
//! recorded in between.
//!
//! ```json
//! {
//!   "name": "startup",
//!   "responses": { "check_daemon_ready": false, "list_peers": [] },
//!   "steps": [
//!     { "at_ms": 20, "op": "emit", "event": "daemon-ready" },
//!     { "at_ms": 40, "op": "select", "peer": "a" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use airdrop_client::{AppState, ClientError, MockDaemon, Session, SessionConfig, SessionHandle};
use airdrop_types::{Call, EventKind, PeerId};
use chrono::Utc;

use crate::render;

/// A scripted run.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Session settings; overrides the configuration file when present
    #[serde(default)]
    pub session: Option<SessionConfig>,
    /// Standing responses, by call name
    #[serde(default)]
    pub responses: BTreeMap<String, Value>,
    /// One-shot failures queued before the session starts, by call name
    #[serde(default)]
    pub failures: BTreeMap<String, String>,
    /// Timeline
    #[serde(default)]
    pub steps: Vec<Step>,
    /// How long to keep observing after the last step
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    50
}

/// One timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Offset from session start
    #[serde(default)]
    pub at_ms: u64,
    /// What happens
    #[serde(flatten)]
    pub op: Op,
}

/// Scenario operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Push an event from the daemon
    Emit {
        event: String,
        #[serde(default)]
        payload: Value,
    },
    /// Change a standing response
    Respond { call: String, value: Value },
    /// Fail the next invocation of a call
    Fail { call: String, message: String },
    /// Manual peer refresh
    Refresh,
    /// Select a peer, or clear the selection
    Select {
        #[serde(default)]
        peer: Option<String>,
    },
    /// Send a file
    Send { peer: String, file: String },
    /// Flip the peer panel
    ToggleSidebar,
    /// Restart the handshake
    Reinitialize,
}

impl Op {
    fn describe(&self) -> String {
        match self {
            Op::Emit { event, .. } => format!("emit {}", event),
            Op::Respond { call, value } => format!("respond {} = {}", call, value),
            Op::Fail { call, message } => format!("fail next {} ({})", call, message),
            Op::Refresh => "refresh peers".to_string(),
            Op::Select { peer: Some(peer) } => format!("select {}", peer),
            Op::Select { peer: None } => "clear selection".to_string(),
            Op::Send { peer, file } => format!("send {} to {}", file, peer),
            Op::ToggleSidebar => "toggle sidebar".to_string(),
            Op::Reinitialize => "reinitialize".to_string(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    /// Parse and validate a scenario.
    pub fn parse(contents: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(contents)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check every call and event name.
    pub fn validate(&self) -> Result<()> {
        for name in self.responses.keys().chain(self.failures.keys()) {
            name.parse::<Call>()?;
        }
        for step in &self.steps {
            match &step.op {
                Op::Emit { event, .. } => {
                    event.parse::<EventKind>()?;
                }
                Op::Respond { call, .. } | Op::Fail { call, .. } => {
                    call.parse::<Call>()?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the scripted daemon.
    pub fn daemon(&self) -> Result<MockDaemon> {
        let daemon = MockDaemon::new();
        for (name, value) in &self.responses {
            daemon.respond(name.parse()?, value.clone());
        }
        for (name, message) in &self.failures {
            daemon.fail_next(name.parse()?, message);
        }
        Ok(daemon)
    }

    fn timeline(&self) -> Vec<Step> {
        let mut steps = self.steps.clone();
        steps.sort_by_key(|step| step.at_ms);
        steps
    }
}

/// Everything observed during a replay.
#[derive(Debug)]
pub struct Report {
    /// Rendered log, one entry per step, note or state change
    pub lines: Vec<String>,
    /// State when observation ended
    pub final_state: AppState,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Entry<'a> {
    Step(&'a Step),
    Note(&'a str),
    State(&'a AppState),
}

struct Output {
    json: bool,
    lines: Vec<String>,
    last_state: Option<AppState>,
}

impl Output {
    fn new(json: bool) -> Self {
        Self {
            json,
            lines: Vec::new(),
            last_state: None,
        }
    }

    fn step(&mut self, step: &Step) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(&Entry::Step(step))?
        } else {
            format!("@{}ms > {}", step.at_ms, step.op.describe())
        };
        self.lines.push(line);
        Ok(())
    }

    fn note(&mut self, note: &str) -> Result<()> {
        let line = if self.json {
            serde_json::to_string(&Entry::Note(note))?
        } else {
            format!("  ! {}", note)
        };
        self.lines.push(line);
        Ok(())
    }

    /// Record a state unless it matches the last one recorded.
    fn state(&mut self, state: &AppState) -> Result<()> {
        if self.last_state.as_ref() == Some(state) {
            return Ok(());
        }
        let line = if self.json {
            serde_json::to_string(&Entry::State(state))?
        } else {
            format!("  {}", render::summary(state))
        };
        self.lines.push(line);
        self.last_state = Some(state.clone());
        Ok(())
    }
}

/// Run a scenario and collect what the session published.
pub async fn replay(scenario: &Scenario, config: SessionConfig, json: bool) -> Result<Report> {
    let config = scenario.session.clone().unwrap_or(config);
    let daemon = scenario.daemon()?;

    let session = Session::start(daemon.clone(), config).await;
    let started = Instant::now();
    let mut watcher = session.watch();
    let mut out = Output::new(json);

    let initial = watcher.borrow_and_update().clone();
    out.state(&initial)?;

    let mut last_at = 0;
    for step in scenario.timeline() {
        follow(&mut watcher, started + Duration::from_millis(step.at_ms), &mut out).await?;
        out.step(&step)?;
        tracing::debug!(at_ms = step.at_ms, op = ?step.op, "Performing step");
        if let Some(note) = perform(&session, &daemon, &step.op).await? {
            out.note(&note)?;
        }
        last_at = step.at_ms;
    }

    let settle = started + Duration::from_millis(last_at + scenario.settle_ms);
    follow(&mut watcher, settle, &mut out).await?;

    let final_state = session.snapshot();
    out.state(&final_state)?;
    session.shutdown().await?;

    Ok(Report {
        lines: out.lines,
        final_state,
    })
}

/// Record published states until `deadline`.
async fn follow(
    watcher: &mut watch::Receiver<AppState>,
    deadline: Instant,
    out: &mut Output,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return Ok(()),
            changed = watcher.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = watcher.borrow_and_update().clone();
                out.state(&state)?;
            }
        }
    }
}

/// Perform one operation. Expected refusals come back as a note.
async fn perform(session: &SessionHandle, daemon: &MockDaemon, op: &Op) -> Result<Option<String>> {
    match op {
        Op::Emit { event, payload } => {
            let kind: EventKind = event.parse()?;
            let delivered = daemon.emit(kind, payload.clone());
            if delivered == 0 {
                return Ok(Some(format!("{} had no subscribers", kind)));
            }
        }
        Op::Respond { call, value } => daemon.respond(call.parse()?, value.clone()),
        Op::Fail { call, message } => daemon.fail_next(call.parse()?, message),
        Op::Refresh => session.refresh_peers().await?,
        Op::Select { peer } => {
            match session.select_peer(peer.clone().map(PeerId::new)).await {
                Ok(()) => {}
                Err(ClientError::Rejected(rejected)) => {
                    return Ok(Some(format!("rejected: {}", rejected)))
                }
                Err(err) => return Err(err.into()),
            }
        }
        Op::Send { peer, file } => match session.send_file(peer, file).await {
            Ok(()) => {}
            Err(ClientError::Session(err)) => return Ok(Some(err.to_string())),
            Err(err) => return Err(err.into()),
        },
        Op::ToggleSidebar => session.toggle_sidebar().await?,
        Op::Reinitialize => session.reinitialize().await?,
    }
    Ok(None)
}

/// Run the replay command.
pub async fn run(path: &Path, config: SessionConfig, json: bool) -> Result<()> {
    let scenario = Scenario::load(path).await?;
    let name = scenario
        .name
        .clone()
        .unwrap_or_else(|| path.display().to_string());
    tracing::info!(scenario = %name, steps = scenario.steps.len(), "Replaying scenario");

    let report = replay(&scenario, config, json).await?;

    if json {
        for line in &report.lines {
            println!("{}", line);
        }
        return Ok(());
    }

    println!("=== airdrop replay: {} ===", name);
    println!();
    for line in &report.lines {
        println!("{}", line);
    }

    let state = &report.final_state;
    println!();
    println!("Final: {}", render::summary(state));
    if let Some(info) = &state.device_info {
        println!("Device: {} (port {})", info.name, info.port);
    }
    if let Some(dir) = &state.download_dir {
        println!("Downloads: {}", dir.display());
    }
    if let Some(peer) = state.selected_peer() {
        println!("Selected: {} ({})", peer.name, peer.address);
    }

    if !state.history.is_empty() {
        println!();
        println!("History:");
        let now = Utc::now();
        for record in state.history.iter() {
            println!("  {}", render::history_line(record, now));
        }
    }

    Ok(())
}
