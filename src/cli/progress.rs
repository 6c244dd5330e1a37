//! Terminal progress display for background refreshes
//!
//! The foreground never joins the worker. It polls status snapshots on an
//! interval and mirrors the progress message into an `indicatif` spinner.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::coordinator::BackgroundCoordinator;
use crate::constants::display;

/// Create a spinner in the application style, hidden in quiet mode
pub fn spinner(message: impl Into<String>, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(display::SPINNER_TICKS);
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Follow a running refresh until it leaves `Running`
///
/// Returns `false` if `timeout` elapsed first; the refresh keeps running.
pub async fn follow_refresh(
    coordinator: &BackgroundCoordinator,
    timeout: Option<Duration>,
    quiet: bool,
) -> bool {
    let started = Instant::now();
    let spinner = spinner("Refreshing jobs...", quiet);
    let mut interval = tokio::time::interval(display::STATUS_POLL_INTERVAL);

    let finished = loop {
        interval.tick().await;

        let status = coordinator.status_snapshot();
        if !status.is_running() {
            break true;
        }
        if let Some(progress) = status.progress() {
            spinner.set_message(progress.to_string());
        }
        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            debug!("Stopped waiting for refresh after {:?}", started.elapsed());
            break false;
        }
    };

    spinner.finish_and_clear();
    finished
}
