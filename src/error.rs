use std::path::PathBuf;
use thiserror::Error;

/// Failures loading `ingest.toml` or applying environment overrides
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures copying a client file into the raw object area
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Source file '{0}' has no file name")]
    NoFileName(PathBuf),

    #[error("Invalid client id '{0}'")]
    InvalidClientId(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File-level failures while processing one roster.
///
/// Any of these aborts the batch: nothing is persisted or audited for it.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid client id '{0}'")]
    InvalidClientId(String),

    #[error("Cannot open roster '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Roster '{path}' has no header row")]
    MissingHeader { path: PathBuf },

    #[error("Malformed roster '{path}' at data line {line}: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write quarantine file '{path}': {message}")]
    Quarantine { path: PathBuf, message: String },
}

/// Persistence failures, fatal for the batch's member write
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error preparing database '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for '{column}' is invalid: {value}")]
    InvalidStoredValue { column: &'static str, value: String },
}

/// Failures writing the JSON audit document
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Invalid client id '{0}'")]
    InvalidClientId(String),

    #[error("Audit file '{path}' already exists")]
    AlreadyExists { path: PathBuf },

    #[error("I/O error writing audit file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for one ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Batch failed: {0}")]
    Batch(#[from] BatchError),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Audit failed: {0}")]
    Audit(#[from] AuditError),
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_converts_into_ingest_error() {
        let err: IngestError = BatchError::MissingHeader {
            path: PathBuf::from("roster.csv"),
        }
        .into();
        assert!(matches!(err, IngestError::Batch(_)));
        assert!(err.to_string().contains("roster.csv"));
    }

    #[test]
    fn test_audit_exists_message_names_path() {
        let err = AuditError::AlreadyExists {
            path: PathBuf::from("data/audit/ingestion_c1.json"),
        };
        assert!(err.to_string().contains("ingestion_c1.json"));
    }
}
