//! Data models for provider listings and cached job tables
//!
//! Provider listings are the typed shape of the JSON returned by each job board.
//! Rows are the flat records stored in the CSV cache; their serde names are the
//! CSV column headers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{cache, providers};

/// Listing identifier as returned by the APIs (numeric or string)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListingId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingId::Number(n) => write!(f, "{}", n),
            ListingId::Text(s) => f.write_str(s),
        }
    }
}

/// One job from the BestJobs API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestJobsListing {
    pub id: ListingId,
    pub slug: String,
    pub title: String,
    pub company_name: Option<String>,
    pub own_apply_url: Option<String>,
}

impl BestJobsListing {
    /// Public page for this listing
    pub fn job_link(&self) -> String {
        format!("{}/{}", providers::BESTJOBS_JOB_URL, self.slug)
    }

    /// Convert into the cached row shape
    pub fn into_row(self) -> BestJobRow {
        let link = self.job_link();
        BestJobRow {
            title: self.title,
            company_name: self.company_name.unwrap_or_default(),
            own_apply_url: self.own_apply_url.unwrap_or_default(),
            link,
        }
    }
}

/// One job from the eJobs API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EJobsListing {
    pub id: ListingId,
    pub slug: String,
    pub title: String,
    pub creation_date: Option<String>,
    pub expiration_date: Option<String>,
    pub external_url: Option<String>,
}

impl EJobsListing {
    /// Public page for this listing
    pub fn job_link(&self) -> String {
        format!("{}/{}/{}", providers::EJOBS_JOB_URL, self.slug, self.id)
    }

    /// Convert into the cached row shape; `externalUrl` becomes `ownApplyUrl`
    pub fn into_row(self) -> EJobRow {
        let link = self.job_link();
        EJobRow {
            title: self.title,
            creation_date: self.creation_date.unwrap_or_default(),
            expiration_date: self.expiration_date.unwrap_or_default(),
            own_apply_url: self.external_url.unwrap_or_default(),
            link,
        }
    }
}

/// Common accessors for cached rows
pub trait JobRow {
    /// Job title, the field filtering and search operate on
    fn title(&self) -> &str;

    /// External application URL, empty when the job applies on-site
    fn own_apply_url(&self) -> &str;
}

/// Row of `bjobs.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestJobRow {
    pub title: String,
    pub company_name: String,
    pub own_apply_url: String,
    pub link: String,
}

/// Row of `ejobs.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EJobRow {
    pub title: String,
    pub creation_date: String,
    pub expiration_date: String,
    pub own_apply_url: String,
    pub link: String,
}

/// Row of `externalJobs.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalJobRow {
    pub title: String,
    pub creation_date: String,
    pub expiration_date: String,
    pub own_apply_url: String,
}

impl JobRow for BestJobRow {
    fn title(&self) -> &str {
        &self.title
    }

    fn own_apply_url(&self) -> &str {
        &self.own_apply_url
    }
}

impl JobRow for EJobRow {
    fn title(&self) -> &str {
        &self.title
    }

    fn own_apply_url(&self) -> &str {
        &self.own_apply_url
    }
}

impl JobRow for ExternalJobRow {
    fn title(&self) -> &str {
        &self.title
    }

    fn own_apply_url(&self) -> &str {
        &self.own_apply_url
    }
}

impl From<&BestJobRow> for ExternalJobRow {
    fn from(row: &BestJobRow) -> Self {
        Self {
            title: row.title.clone(),
            creation_date: String::new(),
            expiration_date: String::new(),
            own_apply_url: row.own_apply_url.clone(),
        }
    }
}

impl From<&EJobRow> for ExternalJobRow {
    fn from(row: &EJobRow) -> Self {
        Self {
            title: row.title.clone(),
            creation_date: row.creation_date.clone(),
            expiration_date: row.expiration_date.clone(),
            own_apply_url: row.own_apply_url.clone(),
        }
    }
}

/// The three cached tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobTable {
    BestJobs,
    EJobs,
    External,
}

impl JobTable {
    /// File name inside the cache directory
    pub fn file_name(self) -> &'static str {
        match self {
            JobTable::BestJobs => cache::BESTJOBS_FILE,
            JobTable::EJobs => cache::EJOBS_FILE,
            JobTable::External => cache::EXTERNAL_FILE,
        }
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            JobTable::BestJobs => "BestJobs",
            JobTable::EJobs => "eJobs",
            JobTable::External => "External Jobs",
        }
    }
}

/// A complete cached dataset
///
/// The two provider tables are mandatory. The external table is derived from
/// them and is absent when no row carries an external application URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedDataset {
    pub bestjobs: Vec<BestJobRow>,
    pub ejobs: Vec<EJobRow>,
    pub external: Option<Vec<ExternalJobRow>>,
}

impl CachedDataset {
    /// Build a dataset from filtered provider rows, deriving the external table
    ///
    /// eJobs rows come first in the external table, then BestJobs rows.
    pub fn from_filtered(bestjobs: Vec<BestJobRow>, ejobs: Vec<EJobRow>) -> Self {
        let external: Vec<ExternalJobRow> = ejobs
            .iter()
            .filter(|row| has_external_url(*row))
            .map(ExternalJobRow::from)
            .chain(
                bestjobs
                    .iter()
                    .filter(|row| has_external_url(*row))
                    .map(ExternalJobRow::from),
            )
            .collect();

        Self {
            bestjobs,
            ejobs,
            external: if external.is_empty() {
                None
            } else {
                Some(external)
            },
        }
    }

    /// External rows, empty when the table is absent
    pub fn external_rows(&self) -> &[ExternalJobRow] {
        self.external.as_deref().unwrap_or(&[])
    }

    /// Row count of one table
    pub fn row_count(&self, table: JobTable) -> usize {
        match table {
            JobTable::BestJobs => self.bestjobs.len(),
            JobTable::EJobs => self.ejobs.len(),
            JobTable::External => self.external_rows().len(),
        }
    }
}

fn has_external_url<R: JobRow>(row: &R) -> bool {
    !row.own_apply_url().trim().is_empty()
}
