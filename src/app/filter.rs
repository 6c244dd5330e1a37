//! Banned-word filtering of job titles
//!
//! A title is dropped when it contains any banned word, compared
//! case-insensitively as a plain substring.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::models::JobRow;
use crate::constants::filter;
use crate::errors::{FilterError, FilterResult};

/// What to do when the banned-words file does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingWordsPolicy {
    /// Warn and keep every row
    #[default]
    Skip,
    /// Fail the refresh
    Fail,
}

impl FromStr for MissingWordsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!("expected 'skip' or 'fail', got '{}'", other)),
        }
    }
}

impl fmt::Display for MissingWordsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// Banned-word filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// One word per line
    pub banned_words_file: PathBuf,
    /// Behaviour when `banned_words_file` is missing
    pub on_missing: MissingWordsPolicy,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            banned_words_file: PathBuf::from(filter::DEFAULT_BANNED_WORDS_FILE),
            on_missing: MissingWordsPolicy::default(),
        }
    }
}

/// A lowercased banned-word list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannedWords {
    words: Vec<String>,
}

impl BannedWords {
    /// Build from raw words; blank entries are ignored
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Load the list named by `config`
    ///
    /// # Errors
    ///
    /// Returns `FilterError::BannedWordsMissing` when the file is absent and the
    /// policy is `Fail`, and `FilterError::Read` for any other read failure
    pub async fn load(config: &FilterConfig) -> FilterResult<Self> {
        Self::load_from(&config.banned_words_file, config.on_missing).await
    }

    async fn load_from(path: &Path, on_missing: MissingWordsPolicy) -> FilterResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let words = Self::new(content.lines());
                info!("Loaded {} banned words from {}", words.len(), path.display());
                Ok(words)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => match on_missing {
                MissingWordsPolicy::Skip => {
                    warn!(
                        "Banned words file {} not found, filtering disabled",
                        path.display()
                    );
                    Ok(Self::default())
                }
                MissingWordsPolicy::Fail => Err(FilterError::BannedWordsMissing {
                    path: path.to_path_buf(),
                }),
            },
            Err(source) => Err(FilterError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// True if `title` contains any banned word
    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.words.iter().any(|word| title.contains(word.as_str()))
    }

    /// Keep only rows whose title is clean
    pub fn retain<R: JobRow>(&self, mut rows: Vec<R>) -> Vec<R> {
        if self.is_empty() || rows.is_empty() {
            return rows;
        }

        let before = rows.len();
        rows.retain(|row| !self.matches(row.title()));
        let removed = before - rows.len();
        if removed > 0 {
            debug!("Filtered out {} jobs containing banned words", removed);
        }
        rows
    }
}

/// Rows whose title contains `query`, case-insensitively
pub fn search_titles<'a, R: JobRow>(rows: &'a [R], query: Option<&str>) -> Vec<&'a R> {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => {
            let query = query.to_lowercase();
            rows.iter()
                .filter(|row| row.title().to_lowercase().contains(&query))
                .collect()
        }
        None => rows.iter().collect(),
    }
}
