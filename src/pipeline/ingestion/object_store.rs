use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::UploadError;
use crate::metrics::IngestionMetrics;

const CHECKSUM_BLOCK_SIZE: usize = 4096;

/// What the uploader knows about a client file once it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionMetadata {
    pub client_id: String,
    /// File name as submitted by the client
    pub file_name: String,
    /// Location of the stored copy
    pub local_path: PathBuf,
    pub ingestion_time: DateTime<Utc>,
    /// Hex SHA-256 of the stored bytes
    pub checksum: String,
    pub file_size: u64,
}

/// A stored object as seen on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub stored_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Filesystem stand-in for the raw object bucket.
///
/// Objects live at `<root>/<client_id>/<yymmdd_HHMMSS>_<file name>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy a client file into the raw area and checksum the stored copy
    pub fn upload_file(
        &self,
        client_id: &str,
        source_path: &Path,
    ) -> Result<IngestionMetadata, UploadError> {
        let file_name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::NoFileName(source_path.to_path_buf()))?
            .to_string();

        self.store(client_id, &file_name, |dest| {
            fs::copy(source_path, dest).map_err(|source| UploadError::Io {
                path: source_path.to_path_buf(),
                source,
            })?;
            Ok(())
        })
    }

    /// Store an in-memory payload under `file_name`
    pub fn upload_bytes(
        &self,
        client_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<IngestionMetadata, UploadError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) {
            return Err(UploadError::NoFileName(PathBuf::from(file_name)));
        }
        self.store(client_id, file_name, |dest| {
            fs::write(dest, bytes).map_err(|source| UploadError::Io {
                path: dest.to_path_buf(),
                source,
            })
        })
    }

    fn store<F>(
        &self,
        client_id: &str,
        file_name: &str,
        write: F,
    ) -> Result<IngestionMetadata, UploadError>
    where
        F: FnOnce(&Path) -> Result<(), UploadError>,
    {
        let result = self.store_inner(client_id, file_name, write);
        match &result {
            Ok(meta) => {
                IngestionMetrics::record_file_uploaded(meta.file_size);
                info!(
                    client_id,
                    file_name,
                    checksum = %meta.checksum,
                    size = meta.file_size,
                    "Stored client file at {}",
                    meta.local_path.display()
                );
            }
            Err(_) => IngestionMetrics::record_upload_error(),
        }
        result
    }

    fn store_inner<F>(
        &self,
        client_id: &str,
        file_name: &str,
        write: F,
    ) -> Result<IngestionMetadata, UploadError>
    where
        F: FnOnce(&Path) -> Result<(), UploadError>,
    {
        let client_dir = self.client_dir(client_id)?;
        fs::create_dir_all(&client_dir).map_err(|source| UploadError::Io {
            path: client_dir.clone(),
            source,
        })?;

        let ingestion_time = Utc::now();
        let stored_name = format!(
            "{}_{}",
            ingestion_time.format(constants::FILE_TIMESTAMP_FORMAT),
            file_name
        );
        let dest = client_dir.join(&stored_name);
        write(&dest)?;

        let (checksum, file_size) = checksum_file(&dest)?;
        debug!("sha256({}) = {}", stored_name, checksum);

        Ok(IngestionMetadata {
            client_id: client_id.to_string(),
            file_name: file_name.to_string(),
            local_path: dest,
            ingestion_time,
            checksum,
            file_size,
        })
    }

    /// Size and modification time of a stored object, if present
    pub fn get_metadata(
        &self,
        client_id: &str,
        stored_name: &str,
    ) -> Result<Option<StoredObject>, UploadError> {
        let path = self.client_dir(client_id)?.join(stored_name);
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(UploadError::Io { path, source }),
        };
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|source| UploadError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Some(StoredObject {
            stored_name: stored_name.to_string(),
            path,
            size: meta.len(),
            modified,
        }))
    }

    /// Remove a stored object; `false` when it did not exist
    pub fn delete_file(&self, client_id: &str, stored_name: &str) -> Result<bool, UploadError> {
        let path = self.client_dir(client_id)?.join(stored_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(client_id, stored_name, "Deleted stored client file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(UploadError::Io { path, source }),
        }
    }

    fn client_dir(&self, client_id: &str) -> Result<PathBuf, UploadError> {
        if !is_valid_client_id(client_id) {
            return Err(UploadError::InvalidClientId(client_id.to_string()));
        }
        Ok(self.root.join(client_id))
    }
}

/// Client ids become directory names, so they must be a single plain path component
pub fn is_valid_client_id(client_id: &str) -> bool {
    !client_id.is_empty()
        && client_id != "."
        && client_id != ".."
        && !client_id.contains(['/', '\\'])
}

/// Hex SHA-256 and byte length of a file, read in fixed-size blocks
pub fn checksum_file(path: &Path) -> Result<(String, u64), UploadError> {
    let io_err = |source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHECKSUM_BLOCK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), total))
}
