//! Refresh rate limiting through a persisted success marker
//!
//! The marker file holds one local timestamp: when the last refresh pipeline
//! finished successfully. A refresh is due when the marker is absent,
//! unreadable, in the future, or at least one window old.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{cache, refresh};
use crate::errors::{MarkerError, MarkerResult};

/// Rate-limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// File holding the last-success timestamp
    pub marker_file: PathBuf,
    /// Minimum time between successful refreshes, in hours
    pub window_hours: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            marker_file: PathBuf::from(refresh::DEFAULT_MARKER_FILE),
            window_hours: refresh::DEFAULT_WINDOW_HOURS,
        }
    }
}

impl RateLimitConfig {
    /// Window as a duration, rounded to the millisecond
    pub fn window(&self) -> Duration {
        Duration::milliseconds((self.window_hours * 3_600_000.0).round() as i64)
    }

    /// Validate the configuration
    ///
    /// The window must be at least one millisecond once rounded and at most
    /// `MAX_WINDOW_HOURS`.
    pub fn validate(&self) -> Result<(), String> {
        if !self.window_hours.is_finite() || self.window_hours <= 0.0 {
            return Err(format!(
                "Refresh window must be a positive number of hours, got {}",
                self.window_hours
            ));
        }
        if self.window_hours > refresh::MAX_WINDOW_HOURS {
            return Err(format!(
                "Refresh window must not exceed {} hours, got {}",
                refresh::MAX_WINDOW_HOURS,
                self.window_hours
            ));
        }
        if self.window() <= Duration::zero() {
            return Err(format!(
                "Refresh window of {} hours rounds to zero milliseconds",
                self.window_hours
            ));
        }
        Ok(())
    }
}

/// Format a marker timestamp
pub fn format_marker(timestamp: NaiveDateTime) -> String {
    timestamp.format(refresh::MARKER_FORMAT).to_string()
}

/// Parse marker content; `None` when it is not a timestamp
///
/// Accepts the canonical format, the same without fractional seconds, and
/// RFC 3339 with an offset (converted to local time).
pub fn parse_marker(content: &str) -> Option<NaiveDateTime> {
    let content = content.trim();
    NaiveDateTime::parse_from_str(content, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(content)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}

/// Decide whether a refresh is due
///
/// Inclusive at the window boundary. A marker later than `now` counts as due.
pub fn is_due_given(last_success: Option<NaiveDateTime>, now: NaiveDateTime, window: Duration) -> bool {
    let Some(last) = last_success else {
        return true;
    };

    let elapsed = now.signed_duration_since(last);
    if elapsed < Duration::zero() {
        warn!(
            "Refresh marker {} is in the future, treating refresh as due",
            format_marker(last)
        );
        return true;
    }

    elapsed >= window
}

/// Persisted "last successful refresh" marker with a due check
#[derive(Debug, Clone)]
pub struct RefreshLimiter {
    marker_path: PathBuf,
    window: Duration,
}

impl RefreshLimiter {
    /// Create a limiter from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_window(config.marker_file.clone(), config.window())
    }

    /// Create a limiter with an explicit window
    pub fn with_window(marker_path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            marker_path: marker_path.into(),
            window,
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current local time, the clock every marker is written in
    pub fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// The recorded last success, `None` if absent or corrupt
    pub async fn last_success(&self) -> Option<NaiveDateTime> {
        let content = match tokio::fs::read_to_string(&self.marker_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No refresh marker at {}", self.marker_path.display());
                return None;
            }
            Err(e) => {
                warn!(
                    "Error reading refresh marker {}: {}",
                    self.marker_path.display(),
                    e
                );
                return None;
            }
        };

        let parsed = parse_marker(&content);
        if parsed.is_none() {
            warn!(
                "Refresh marker {} is corrupt ({:?}), treating as absent",
                self.marker_path.display(),
                content.trim()
            );
        }
        parsed
    }

    /// Whether a refresh is due now
    pub async fn is_due(&self) -> bool {
        self.is_due_at(Self::now()).await
    }

    /// Whether a refresh is due at `now`
    pub async fn is_due_at(&self, now: NaiveDateTime) -> bool {
        let last = self.last_success().await;
        let due = is_due_given(last, now, self.window);

        if let (false, Some(last)) = (due, last) {
            let remaining = self.window - now.signed_duration_since(last);
            info!(
                "Last refresh at {}, next one due in {:.1} hours",
                format_marker(last),
                remaining.num_seconds() as f64 / 3600.0
            );
        }
        due
    }

    /// When the next refresh becomes due
    ///
    /// `None` means due already, or a due time past the representable range.
    pub async fn next_due_at(&self) -> Option<NaiveDateTime> {
        let now = Self::now();
        let last = self.last_success().await?;
        if is_due_given(Some(last), now, self.window) {
            return None;
        }

        let next = last.checked_add_signed(self.window);
        if next.is_none() {
            warn!(
                "Next refresh after {} is out of range for a {} hour window",
                format_marker(last),
                self.window.num_hours()
            );
        }
        next
    }

    /// Overwrite the marker with `now`
    ///
    /// Call only after the refresh pipeline saved its data.
    ///
    /// # Errors
    ///
    /// Returns `MarkerError::Write` if the marker cannot be written
    pub async fn record_success(&self, now: NaiveDateTime) -> MarkerResult<()> {
        let write_err = |source| MarkerError::Write {
            path: self.marker_path.clone(),
            source,
        };

        if let Some(parent) = self.marker_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }

        let mut temp_name = self.marker_path.as_os_str().to_os_string();
        temp_name.push(cache::TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, format_marker(now))
            .await
            .map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.marker_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(write_err(e));
        }

        debug!("Recorded refresh success at {}", format_marker(now));
        Ok(())
    }

    /// Remove the marker so the next check is due
    ///
    /// # Errors
    ///
    /// Returns `MarkerError::Remove` for failures other than a missing file
    pub async fn clear(&self) -> MarkerResult<()> {
        match tokio::fs::remove_file(&self.marker_path).await {
            Ok(()) => {
                info!("Cleared refresh marker {}", self.marker_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MarkerError::Remove {
                path: self.marker_path.clone(),
                source,
            }),
        }
    }
}
