//! Command handlers for Job Fetcher CLI
//!
//! This module implements the command handlers that connect CLI arguments to
//! the coordinator, the cache and the refresh marker.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::cache::{encode_rows, CsvTable};
use crate::app::coordinator::{BackgroundCoordinator, RunState, StartDecision};
use crate::app::filter::search_titles;
use crate::app::models::{BestJobRow, CachedDataset, EJobRow, ExternalJobRow, JobRow, JobTable};
use crate::app::rate_limiter::format_marker;
use crate::cli::args::{ExportArgs, RefreshArgs, RunArgs, ShowArgs};
use crate::cli::progress::follow_refresh;
use crate::config::AppConfig;
use crate::errors::{AppError, CacheError, Result};

const TABLES: [JobTable; 3] = [JobTable::BestJobs, JobTable::EJobs, JobTable::External];

/// The worker dies with the process and writes no marker
const ABANDONED_NOTE: &str = "the unfinished refresh is abandoned and retried on the next launch";

fn timed_out_message(timeout_secs: u64) -> String {
    format!(
        "Refresh did not finish within {} seconds; {}",
        timeout_secs, ABANDONED_NOTE
    )
}

/// Handle the run command
///
/// Starts a refresh when one is due, prints what is cached right away, then
/// follows the refresh and prints the result.
pub async fn handle_run(config: &AppConfig, args: RunArgs, quiet: bool) -> Result<()> {
    let coordinator = config.build_coordinator()?;
    let decision = coordinator.maybe_start().await;
    info!("Run: {}", decision);

    print_cache_summary(config, "Cached jobs").await?;

    match decision {
        StartDecision::Started => {
            println!();
            let finished =
                follow_refresh(&coordinator, args.timeout.map(Duration::from_secs), quiet).await;
            if !finished {
                warn!("Leaving a refresh unfinished");
                println!("⏳ {}", timed_out_message(args.timeout.unwrap_or_default()));
                println!("   Cached data is shown above");
                return Ok(());
            }
            report_outcome(&coordinator);
            if coordinator.status_snapshot().state() == RunState::Completed {
                println!();
                print_cache_summary(config, "Refreshed jobs").await?;
            }
        }
        StartDecision::AlreadyRunning => println!("🔄 A refresh is already running"),
        StartDecision::NotDue => {
            let status = coordinator.status_snapshot();
            println!("ℹ️  {}", status.progress().unwrap_or_default());
        }
    }

    Ok(())
}

/// Handle the refresh command
///
/// Fails when the refresh fails or does not finish within `--timeout`.
pub async fn handle_refresh(config: &AppConfig, args: RefreshArgs, quiet: bool) -> Result<()> {
    let coordinator = config.build_coordinator()?;

    if args.force {
        coordinator.force().await?;
        println!("🔄 Force flag set - refresh window cleared");
    }

    match coordinator.maybe_start().await {
        StartDecision::NotDue => {
            let next = coordinator.pipeline().limiter().next_due_at().await;
            match next {
                Some(next) => println!(
                    "ℹ️  Refresh not due until {} (use --force to refresh now)",
                    format_marker(next)
                ),
                None => println!("ℹ️  Refresh not due (use --force to refresh now)"),
            }
            return Ok(());
        }
        StartDecision::AlreadyRunning => {
            println!("🔄 A refresh is already running");
        }
        StartDecision::Started => {}
    }

    let timeout = args.timeout.map(Duration::from_secs);
    if !follow_refresh(&coordinator, timeout, quiet).await {
        return Err(AppError::generic(timed_out_message(
            args.timeout.unwrap_or_default(),
        )));
    }

    report_outcome(&coordinator);
    let status = coordinator.status_snapshot();
    match status.state() {
        RunState::Failed => Err(AppError::generic(format!(
            "Refresh failed: {}",
            status.error().unwrap_or("unknown error")
        ))),
        _ => Ok(()),
    }
}

/// Handle the status command
pub async fn handle_status(config: &AppConfig) -> Result<()> {
    let limiter = config.limiter();

    println!("📋 Refresh Status");
    println!("=================");
    println!("Marker file:    {}", limiter.marker_path().display());
    match limiter.last_success().await {
        Some(last) => println!("Last refresh:   {}", format_marker(last)),
        None => println!("Last refresh:   never"),
    }
    println!("Window:         {} hours", config.refresh.window_hours);
    if limiter.is_due().await {
        println!("Refresh due:    yes");
    } else {
        println!("Refresh due:    no");
        if let Some(next) = limiter.next_due_at().await {
            println!("Next refresh:   {}", format_marker(next));
        }
    }

    println!();
    print_cache_summary(config, "Cache").await
}

/// Handle the show command
pub async fn handle_show(config: &AppConfig, args: ShowArgs) -> Result<()> {
    let dataset = load_required(config).await?;
    let table = JobTable::from(args.table);
    let search = args.search.as_deref();

    let (lines, matched) = match table {
        JobTable::BestJobs => render_rows(&dataset.bestjobs, search, args.limit, bestjobs_line),
        JobTable::EJobs => render_rows(&dataset.ejobs, search, args.limit, ejobs_line),
        JobTable::External => {
            render_rows(dataset.external_rows(), search, args.limit, external_line)
        }
    };

    println!("📋 {} ({} rows)", table.label(), dataset.row_count(table));
    for line in &lines {
        println!("  {}", line);
    }
    if matched > lines.len() {
        println!("  ... and {} more", matched - lines.len());
    }
    if matched == 0 {
        println!("  No matching jobs");
    }
    Ok(())
}

/// Handle the export command
pub async fn handle_export(config: &AppConfig, args: ExportArgs) -> Result<()> {
    let dataset = load_required(config).await?;
    let table = JobTable::from(args.table);
    let search = args.search.as_deref();

    let written = match table {
        JobTable::BestJobs => export_rows(&dataset.bestjobs, search, &args.output).await?,
        JobTable::EJobs => export_rows(&dataset.ejobs, search, &args.output).await?,
        JobTable::External => export_rows(dataset.external_rows(), search, &args.output).await?,
    };

    println!(
        "✅ Exported {} {} rows to {}",
        written,
        table.label(),
        args.output.display()
    );
    Ok(())
}

/// Handle the force command
pub async fn handle_force(config: &AppConfig) -> Result<()> {
    let limiter = config.limiter();
    limiter.clear().await?;
    println!(
        "✅ Cleared refresh marker {}; the next run will refresh",
        limiter.marker_path().display()
    );
    Ok(())
}

fn report_outcome(coordinator: &BackgroundCoordinator) {
    let status = coordinator.status_snapshot();
    let elapsed = status
        .elapsed()
        .map(|d| format!(" in {:.1}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_default();

    match status.state() {
        RunState::Completed => println!(
            "✅ {}{}",
            status.progress().unwrap_or("Refresh completed"),
            elapsed
        ),
        RunState::Failed => println!(
            "❌ Refresh failed{}: {}",
            elapsed,
            status.error().unwrap_or("unknown error")
        ),
        RunState::Idle | RunState::Running => {}
    }
}

async fn print_cache_summary(config: &AppConfig, heading: &str) -> Result<()> {
    let store = config.cache_store();
    match store.load().await? {
        Some(dataset) => {
            println!("📊 {} ({}):", heading, store.cache_root().display());
            for table in TABLES {
                println!("  {:<14} {}", table.label(), dataset.row_count(table));
            }
        }
        None => println!("📊 {}: no cached data yet", heading),
    }
    Ok(())
}

async fn load_required(config: &AppConfig) -> Result<CachedDataset> {
    config.cache_store().load().await?.ok_or_else(|| {
        AppError::generic("No cached data yet; run `job_fetcher refresh` first")
    })
}

/// Format up to `limit` matching rows; also returns the match count
fn render_rows<R: JobRow>(
    rows: &[R],
    search: Option<&str>,
    limit: usize,
    line: fn(&R) -> String,
) -> (Vec<String>, usize) {
    let matched = search_titles(rows, search);
    let lines = matched.iter().take(limit).map(|row| line(row)).collect();
    (lines, matched.len())
}

fn bestjobs_line(row: &BestJobRow) -> String {
    let company = if row.company_name.is_empty() {
        "-"
    } else {
        row.company_name.as_str()
    };
    format!("{} | {} | {}", row.title, company, row.link)
}

fn ejobs_line(row: &EJobRow) -> String {
    format!("{} | {} | {}", row.title, row.creation_date, row.link)
}

fn external_line(row: &ExternalJobRow) -> String {
    format!("{} | {}", row.title, row.own_apply_url)
}

async fn export_rows<R>(rows: &[R], search: Option<&str>, output: &Path) -> Result<usize>
where
    R: CsvTable + JobRow + Clone,
{
    let selected: Vec<R> = search_titles(rows, search).into_iter().cloned().collect();
    let bytes = encode_rows(&selected, output)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            warn!("Creating export directory {}", parent.display());
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| CacheError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }
    tokio::fs::write(output, bytes)
        .await
        .map_err(|source| CacheError::Io {
            path: output.to_path_buf(),
            source,
        })?;

    Ok(selected.len())
}
