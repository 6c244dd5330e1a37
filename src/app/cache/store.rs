//! CSV cache store with atomic writes
//!
//! Each table is encoded in memory and written to `<file>.tmp`. Only once
//! every table is staged are the temp files renamed over the final names,
//! back to back, so a concurrent reader sees either the old file or the new
//! one and a failed write leaves the previous run's tables untouched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::app::models::{BestJobRow, CachedDataset, EJobRow, ExternalJobRow, JobTable};
use crate::constants::cache;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;

/// A row type stored as one CSV table
pub trait CsvTable: Serialize + DeserializeOwned {
    /// Which table this row belongs to
    const TABLE: JobTable;

    /// Header row, in column order
    const COLUMNS: &'static [&'static str];
}

impl CsvTable for BestJobRow {
    const TABLE: JobTable = JobTable::BestJobs;
    const COLUMNS: &'static [&'static str] = &["title", "companyName", "ownApplyUrl", "link"];
}

impl CsvTable for EJobRow {
    const TABLE: JobTable = JobTable::EJobs;
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "creationDate",
        "expirationDate",
        "ownApplyUrl",
        "link",
    ];
}

impl CsvTable for ExternalJobRow {
    const TABLE: JobTable = JobTable::External;
    const COLUMNS: &'static [&'static str] =
        &["title", "creationDate", "expirationDate", "ownApplyUrl"];
}

/// A fully written temp file waiting to replace its table
#[derive(Debug)]
struct StagedFile {
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl StagedFile {
    /// Rename the temp file over the final name
    async fn commit(&self) -> CacheResult<()> {
        if let Err(source) = fs::rename(&self.temp_path, &self.final_path).await {
            error!("Failed to rename temporary file: {}", source);
            let _ = fs::remove_file(&self.temp_path).await;
            return Err(CacheError::AtomicOperationFailed {
                temp_path: self.temp_path.clone(),
                final_path: self.final_path.clone(),
                source,
            });
        }

        debug!("Wrote {}", self.final_path.display());
        Ok(())
    }
}

/// Reads and writes the cached job tables
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at the configured directory
    ///
    /// The directory is created lazily by [`save`](Self::save).
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cache_root: config.cache_root.clone(),
        }
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Canonical location of one table
    pub fn table_path(&self, table: JobTable) -> PathBuf {
        self.cache_root.join(table.file_name())
    }

    /// Canonical locations of all three tables
    pub fn file_paths(&self) -> [PathBuf; 3] {
        [
            self.table_path(JobTable::BestJobs),
            self.table_path(JobTable::EJobs),
            self.table_path(JobTable::External),
        ]
    }

    /// Overwrite the cache with `dataset`
    ///
    /// A dataset without an external table removes any previous
    /// `externalJobs.csv`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the directory cannot be created or any file
    /// cannot be written
    pub async fn save(&self, dataset: &CachedDataset) -> CacheResult<()> {
        Self::ensure_directory_exists(&self.cache_root).await?;

        let mut staged = Vec::with_capacity(3);
        if let Err(e) = self.stage_all(dataset, &mut staged).await {
            for file in &staged {
                let _ = fs::remove_file(&file.temp_path).await;
            }
            return Err(e);
        }

        for (i, file) in staged.iter().enumerate() {
            if let Err(e) = file.commit().await {
                for rest in &staged[i + 1..] {
                    let _ = fs::remove_file(&rest.temp_path).await;
                }
                return Err(e);
            }
        }

        if dataset.external.is_none() {
            let path = self.table_path(JobTable::External);
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale external table {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }

        info!(
            "Saved {} BestJobs, {} eJobs and {} external jobs to {}",
            dataset.bestjobs.len(),
            dataset.ejobs.len(),
            dataset.external_rows().len(),
            self.cache_root.display()
        );
        Ok(())
    }

    /// Load the cached dataset
    ///
    /// Returns `Ok(None)` unless both mandatory tables are present and
    /// readable. A missing or malformed external table only clears
    /// `external`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` for I/O failures other than a missing file
    pub async fn load(&self) -> CacheResult<Option<CachedDataset>> {
        let Some(bestjobs) = self.read_mandatory::<BestJobRow>().await? else {
            return Ok(None);
        };
        let Some(ejobs) = self.read_mandatory::<EJobRow>().await? else {
            return Ok(None);
        };

        let external = match self.read_table::<ExternalJobRow>().await {
            Ok(rows) => rows,
            Err(e) if e.is_malformed() => {
                warn!("Ignoring unreadable external table: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Some(CachedDataset {
            bestjobs,
            ejobs,
            external,
        }))
    }

    /// True if both mandatory tables exist and can be read
    pub async fn exists(&self) -> bool {
        matches!(self.read_table::<BestJobRow>().await, Ok(Some(_)))
            && matches!(self.read_table::<EJobRow>().await, Ok(Some(_)))
    }

    /// Read a mandatory table, folding malformed content into "absent"
    async fn read_mandatory<R: CsvTable>(&self) -> CacheResult<Option<Vec<R>>> {
        match self.read_table::<R>().await {
            Err(e) if e.is_malformed() => {
                warn!("Cached {} table is unreadable: {}", R::TABLE.label(), e);
                Ok(None)
            }
            other => other,
        }
    }

    /// Read one table; `Ok(None)` when the file does not exist
    async fn read_table<R: CsvTable>(&self) -> CacheResult<Option<Vec<R>>> {
        let path = self.table_path(R::TABLE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache table not present: {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        decode_rows::<R>(&bytes).map(Some)
    }

    /// Stage every table of `dataset`, pushing each as it is written
    async fn stage_all(
        &self,
        dataset: &CachedDataset,
        staged: &mut Vec<StagedFile>,
    ) -> CacheResult<()> {
        staged.push(self.stage_table(&dataset.bestjobs).await?);
        staged.push(self.stage_table(&dataset.ejobs).await?);
        if let Some(rows) = &dataset.external {
            staged.push(self.stage_table(rows).await?);
        }
        Ok(())
    }

    /// Encode `rows` and write them next to their table as a temp file
    async fn stage_table<R: CsvTable>(&self, rows: &[R]) -> CacheResult<StagedFile> {
        let final_path = self.table_path(R::TABLE);
        let content = encode_rows(rows, &final_path)?;

        let mut temp_name = final_path.as_os_str().to_os_string();
        temp_name.push(cache::TEMP_FILE_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content)
            .await
            .map_err(|source| {
                error!("Failed to write temporary file: {}", source);
                CacheError::Io {
                    path: temp_path.clone(),
                    source,
                }
            })?;

        Ok(StagedFile {
            temp_path,
            final_path,
        })
    }

    /// Ensure a directory exists, creating it if necessary
    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|source| {
                error!("Failed to create cache directory: {}", source);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }
}

/// Encode rows as CSV with the header row always present
pub fn encode_rows<R: CsvTable>(rows: &[R], path: &Path) -> CacheResult<Vec<u8>> {
    let table = R::TABLE.file_name();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .write_record(R::COLUMNS)
        .map_err(|source| CacheError::Csv { table, source })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|source| CacheError::Csv { table, source })?;
    }

    writer.into_inner().map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}

/// Decode CSV bytes, requiring every expected column in the header
pub fn decode_rows<R: CsvTable>(bytes: &[u8]) -> CacheResult<Vec<R>> {
    let table = R::TABLE.file_name();
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|source| CacheError::Csv { table, source })?
        .clone();
    if R::COLUMNS
        .iter()
        .any(|column| !headers.iter().any(|h| h == *column))
    {
        return Err(CacheError::InvalidHeader {
            table,
            expected: R::COLUMNS,
            found: headers.iter().map(str::to_string).collect(),
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<R>, _>>()
        .map_err(|source| CacheError::Csv { table, source })
}
