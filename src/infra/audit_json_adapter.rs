use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::AuditSink;
use crate::constants;
use crate::error::AuditError;
use crate::metrics::PersistenceMetrics;
use crate::pipeline::audit::AuditRecord;
use crate::pipeline::ingestion::is_valid_client_id;

/// File-based implementation of AuditSink.
/// Writes one pretty-printed JSON document per batch and never overwrites.
#[derive(Debug, Clone)]
pub struct JsonAuditWriter {
    root: PathBuf,
}

impl JsonAuditWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/ingestion_<client_id>_<yymmdd_HHMMSS>_<batch8>.json`
    pub fn path_for(&self, record: &AuditRecord) -> PathBuf {
        self.root.join(format!(
            "ingestion_{}_{}_{}.json",
            record.client_id,
            record.timestamp.format(constants::FILE_TIMESTAMP_FORMAT),
            constants::short_batch_id(&record.batch_id)
        ))
    }
}

impl AuditSink for JsonAuditWriter {
    fn write_audit(&self, record: &AuditRecord) -> Result<PathBuf, AuditError> {
        if !is_valid_client_id(&record.client_id) {
            return Err(AuditError::InvalidClientId(record.client_id.clone()));
        }
        let path = self.path_for(record);
        fs::create_dir_all(&self.root).map_err(|source| AuditError::Io {
            path: self.root.clone(),
            source,
        })?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => AuditError::AlreadyExists { path: path.clone() },
                _ => AuditError::Io {
                    path: path.clone(),
                    source,
                },
            })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.flush().map_err(|source| AuditError::Io {
            path: path.clone(),
            source,
        })?;

        PersistenceMetrics::record_audit_written();
        info!("Audit record written to {}", path.display());
        Ok(path)
    }
}
