//! Background refresh coordination
//!
//! The coordinator owns the single background slot in which the refresh
//! pipeline runs. Callers ask it to start a refresh when one is due, then
//! read the published [`RunStatus`] while the pipeline works.
//!
//! # Guarantees
//!
//! - At most one pipeline executes at a time. The check-and-start sequence
//!   runs under one lock, so two concurrent `maybe_start` calls cannot both
//!   start a run.
//! - Status changes replace the whole value at once; readers never observe a
//!   half-updated status.
//! - A pipeline that panics is reported as failed, so waiters never block on
//!   a dead run. A worker that still ends without publishing is marked failed
//!   on the next `maybe_start`.
//!
//! # Module Organization
//!
//! - [`status`] - Run status values and the shared cell that publishes them
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use job_fetcher::app::coordinator::{BackgroundCoordinator, StartDecision};
//! # use job_fetcher::app::pipeline::RefreshPipeline;
//!
//! # async fn example(pipeline: RefreshPipeline) {
//! let coordinator = BackgroundCoordinator::new(Arc::new(pipeline));
//! if coordinator.maybe_start().await == StartDecision::Started {
//!     coordinator.wait_for_completion(Some(Duration::from_secs(600))).await;
//! }
//! println!("{:?}", coordinator.status_snapshot().state());
//! # }
//! ```

pub mod status;

#[cfg(test)]
pub mod tests;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::pipeline::{RefreshOutcome, RefreshPipeline};
use crate::errors::MarkerResult;

pub use status::{RunState, RunStatus, StatusCell, StatusProgress};

/// Progress text shown when the marker says a refresh is not due
pub const NOT_DUE_MESSAGE: &str = "Rate limit not reached - using cached data";

/// Error text for a worker that ended without reporting
pub const WORKER_LOST_MESSAGE: &str = "Background worker terminated unexpectedly";

/// What `maybe_start` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// A new run was spawned
    Started,
    /// A run is already in progress
    AlreadyRunning,
    /// The last success is inside the refresh window
    NotDue,
}

impl fmt::Display for StartDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StartDecision::Started => "refresh started",
            StartDecision::AlreadyRunning => "refresh already running",
            StartDecision::NotDue => "refresh not due",
        };
        f.write_str(text)
    }
}

/// Schedules the refresh pipeline in the background
pub struct BackgroundCoordinator {
    pipeline: Arc<RefreshPipeline>,
    status: Arc<StatusCell>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundCoordinator {
    /// Create an idle coordinator around a pipeline
    pub fn new(pipeline: Arc<RefreshPipeline>) -> Self {
        Self {
            pipeline,
            status: Arc::new(StatusCell::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &Arc<RefreshPipeline> {
        &self.pipeline
    }

    /// Start a refresh if none is running and one is due
    ///
    /// Returns immediately; the pipeline runs on a spawned task.
    pub async fn maybe_start(&self) -> StartDecision {
        let mut worker = self.worker.lock().await;

        if self.status.snapshot().is_running() {
            match worker.as_ref() {
                Some(handle) if !handle.is_finished() => {
                    debug!("Refresh already in progress");
                    return StartDecision::AlreadyRunning;
                }
                _ => {
                    warn!("Refresh worker ended without reporting an outcome");
                    self.status
                        .update(|current| current.failed(Local::now(), WORKER_LOST_MESSAGE));
                }
            }
        }

        if !self.pipeline.limiter().is_due().await {
            info!("{}", NOT_DUE_MESSAGE);
            self.status.replace(RunStatus::idle(NOT_DUE_MESSAGE));
            return StartDecision::NotDue;
        }

        self.status.replace(RunStatus::started(Local::now()));
        let pipeline = Arc::clone(&self.pipeline);
        let status = Arc::clone(&self.status);
        *worker = Some(tokio::spawn(run_worker(pipeline, status)));

        info!("Started background refresh");
        StartDecision::Started
    }

    /// Clear the marker so the next `maybe_start` is due
    ///
    /// Does not start a run itself.
    ///
    /// # Errors
    ///
    /// Returns `MarkerError` if the marker exists but cannot be removed
    pub async fn force(&self) -> MarkerResult<()> {
        self.pipeline.limiter().clear().await?;
        info!("Refresh forced, rate limit cleared");
        Ok(())
    }

    /// Consistent copy of the current status
    pub fn status_snapshot(&self) -> Arc<RunStatus> {
        self.status.snapshot()
    }

    /// Receiver notified whenever the status changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<RunStatus>> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.status.snapshot().is_running()
    }

    /// Wait until the status leaves `Running`
    ///
    /// Returns `false` if `timeout` elapsed first. Returns `true` at once when
    /// nothing is running.
    pub async fn wait_for_completion(&self, timeout: Option<Duration>) -> bool {
        let mut rx = self.status.subscribe();
        let finished = rx.wait_for(|status| !status.is_running());

        match timeout {
            Some(limit) => matches!(tokio::time::timeout(limit, finished).await, Ok(Ok(_))),
            None => finished.await.is_ok(),
        }
    }
}

async fn run_worker(pipeline: Arc<RefreshPipeline>, status: Arc<StatusCell>) {
    let progress = StatusProgress::new(Arc::clone(&status));

    // Inner task so a panicking pipeline surfaces as a JoinError here
    let run = tokio::spawn(async move { pipeline.run(&progress).await });

    match run.await {
        Ok(RefreshOutcome::Success(report)) => {
            let summary = report.summary();
            info!("Refresh completed: {}", summary);
            status.update(|current| current.completed(Local::now(), summary));
        }
        Ok(RefreshOutcome::Failure(err)) => {
            error!("Refresh failed during {} step: {}", err.step(), err);
            status.update(|current| current.failed(Local::now(), err.to_string()));
        }
        Err(join_err) => {
            error!("Refresh worker aborted: {}", join_err);
            status.update(|current| current.failed(Local::now(), WORKER_LOST_MESSAGE));
        }
    }
}
