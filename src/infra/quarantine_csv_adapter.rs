use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::QuarantineSink;
use crate::constants;
use crate::pipeline::processing::RejectedRow;

/// File-based implementation of QuarantineSink.
/// Writes one CSV per batch with `row_data,error_message` columns.
#[derive(Debug, Clone)]
pub struct CsvQuarantineWriter {
    root: PathBuf,
}

impl CsvQuarantineWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn write_csv(path: &Path, rows: &[RejectedRow]) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            constants::QUARANTINE_ROW_DATA,
            constants::QUARANTINE_ERROR_MESSAGE,
        ])?;
        for row in rows {
            writer.write_record([row.raw.to_json_string(), row.error_message()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl QuarantineSink for CsvQuarantineWriter {
    fn write_rejected(&self, path: &Path, rows: &[RejectedRow]) -> Result<(), String> {
        Self::write_csv(path, rows).map_err(|e| e.to_string())?;
        info!("Wrote {} rejected rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
