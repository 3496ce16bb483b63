// # File Storage
//
// File-based implementation of Storage.
//
// ## Purpose
//
// Holds the persisted index record in a single file inside the configured
// data directory, so assignments survive daemon restarts.
//
// ## Crash Safety
//
// - Atomic writes: new record written to a temporary file, then renamed
// - Automatic backup: the previous record is copied to `.backup` before the
//   rename, unless it is known not to decode
// - Recovery: the store actor reads the backup when the main record does
//   not decode

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::Storage;

/// File name of the record inside the data directory
pub const RECORD_FILE_NAME: &str = "ipmapper";

/// File-based record storage with atomic replace
///
/// # Example
///
/// ```rust,no_run
/// use ipalloc_core::state::FileStorage;
/// use ipalloc_core::traits::Storage;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = FileStorage::in_dir("/var/lib/ipalloc")?;
///
///     storage.save(b"{}").await?;
///     assert_eq!(storage.load().await?, Some(b"{}".to_vec()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Store the record at an explicit file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store the record as [`RECORD_FILE_NAME`] inside `data_dir`
    ///
    /// The directory must already exist; creating it is the operator's job.
    pub fn in_dir<P: AsRef<Path>>(data_dir: P) -> Result<Self, Error> {
        Self::in_dir_named(data_dir, RECORD_FILE_NAME)
    }

    /// Store the record as `file_name` inside `data_dir`
    pub fn in_dir_named<P: AsRef<Path>>(data_dir: P, file_name: &str) -> Result<Self, Error> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(Error::config(format!(
                "Data directory does not exist: {}",
                data_dir.display()
            )));
        }
        Ok(Self::new(data_dir.join(file_name)))
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a file, treating a missing file as "nothing stored"
    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Record file does not exist: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Get path to temporary file for atomic writes
    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    /// Get path to backup file
    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Write `bytes` to the temp file, optionally back up the current
    /// record, then rename into place
    async fn write_record(&self, bytes: &[u8], keep_previous: bool) -> Result<(), Error> {
        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(bytes).await.map_err(|e| {
                Error::storage(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::storage(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        // Keep the previous record as backup
        if keep_previous && fs::try_exists(&self.path).await.unwrap_or(false) {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::storage(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Record written to file: {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self) -> Result<Option<Vec<u8>>, Error> {
        Self::read_optional(&self.path).await
    }

    async fn load_backup(&self) -> Result<Option<Vec<u8>>, Error> {
        Self::read_optional(&Self::backup_path(&self.path)).await
    }

    async fn save(&self, bytes: &[u8]) -> Result<(), Error> {
        self.write_record(bytes, true).await
    }

    async fn save_replacing_corrupt(&self, bytes: &[u8]) -> Result<(), Error> {
        self.write_record(bytes, false).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
