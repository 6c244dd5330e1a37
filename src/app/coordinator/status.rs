//! Run status of the background refresh
//!
//! A [`RunStatus`] is an immutable value. Every change builds a new value and
//! swaps it into the [`StatusCell`] as one `Arc`, so a reader copies a pointer
//! and always sees a whole status.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use tokio::sync::watch;

use crate::app::pipeline::ProgressSink;

/// Lifecycle state of one refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the refresh lifecycle
///
/// Fields are private: the constructors below are the only way to build a
/// status, which keeps `error` present exactly when the state is `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    state: RunState,
    progress: Option<String>,
    started_at: Option<DateTime<Local>>,
    finished_at: Option<DateTime<Local>>,
    error: Option<String>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            progress: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}

impl RunStatus {
    /// Idle with an explanatory message
    pub fn idle(progress: impl Into<String>) -> Self {
        Self {
            progress: Some(progress.into()),
            ..Self::default()
        }
    }

    /// A fresh run that started at `now`
    pub fn started(now: DateTime<Local>) -> Self {
        Self {
            state: RunState::Running,
            progress: Some("Initializing scraper...".to_string()),
            started_at: Some(now),
            finished_at: None,
            error: None,
        }
    }

    /// Same run with a new progress message; ignored unless running
    pub fn with_progress(&self, progress: impl Into<String>) -> Self {
        if self.state != RunState::Running {
            return self.clone();
        }
        Self {
            progress: Some(progress.into()),
            ..self.clone()
        }
    }

    /// Successful end of the current run
    pub fn completed(&self, now: DateTime<Local>, summary: impl Into<String>) -> Self {
        Self {
            state: RunState::Completed,
            progress: Some(summary.into()),
            started_at: self.started_at.or(Some(now)),
            finished_at: Some(now),
            error: None,
        }
    }

    /// Failed end of the current run
    pub fn failed(&self, now: DateTime<Local>, error: impl Into<String>) -> Self {
        Self {
            state: RunState::Failed,
            progress: self.progress.clone(),
            started_at: self.started_at.or(Some(now)),
            finished_at: Some(now),
            error: Some(error.into()),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// True once the run has completed or failed
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Failed)
    }

    /// Time since start, up to `finished_at` or now
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_at(Local::now())
    }

    /// Time since start, up to `finished_at` or `now`
    pub fn elapsed_at(&self, now: DateTime<Local>) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or(now);
        Some(end.signed_duration_since(start).max(Duration::zero()))
    }
}

/// Shared holder of the current [`RunStatus`]
///
/// Backed by a `watch` channel so waiters can be notified of changes.
#[derive(Debug)]
pub struct StatusCell {
    tx: watch::Sender<Arc<RunStatus>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(RunStatus::default()));
        Self { tx }
    }

    /// Consistent copy of the current status
    pub fn snapshot(&self) -> Arc<RunStatus> {
        Arc::clone(&self.tx.borrow())
    }

    /// Swap in a new status
    pub fn replace(&self, status: RunStatus) {
        self.tx.send_replace(Arc::new(status));
    }

    /// Derive the next status from the current one in a single swap
    pub fn update(&self, next: impl FnOnce(&RunStatus) -> RunStatus) {
        self.tx
            .send_modify(|current| *current = Arc::new(next(current.as_ref())));
    }

    /// Receiver notified on every change
    pub fn subscribe(&self) -> watch::Receiver<Arc<RunStatus>> {
        self.tx.subscribe()
    }
}

/// Progress sink that writes messages into a status cell
pub struct StatusProgress {
    status: Arc<StatusCell>,
}

impl StatusProgress {
    pub fn new(status: Arc<StatusCell>) -> Self {
        Self { status }
    }
}

impl ProgressSink for StatusProgress {
    fn report(&self, message: &str) {
        tracing::debug!("{}", message);
        self.status.update(|current| current.with_progress(message));
    }
}
