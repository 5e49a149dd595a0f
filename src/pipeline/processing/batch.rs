//! Batch processing: one client roster file in, one [`IngestionBatch`] out.
//!
//! Every data row is validated and lands in exactly one of `accepted` or
//! `rejected`. Rejected rows are written to a single quarantine report per
//! batch; a batch without rejections leaves no report behind.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::app::ports::QuarantineSink;
use crate::constants;
use crate::domain::{NormalizedMember, RawRow};
use crate::error::BatchError;
use crate::metrics::ValidationMetrics;
use crate::pipeline::ingestion::is_valid_client_id;
use crate::pipeline::processing::validate::{FieldError, RecordValidator};

/// A row that failed validation, with every rule it violated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub client_id: String,
    pub file_name: String,
    pub raw: RawRow,
    pub errors: Vec<FieldError>,
}

impl RejectedRow {
    /// Errors as `field: message` strings, in the order they were found
    pub fn error_strings(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    /// Value of the quarantine `error_message` column
    pub fn error_message(&self) -> String {
        self.error_strings().join(constants::ERROR_JOIN_SEPARATOR)
    }
}

/// Outcome of processing one file
#[derive(Debug, Clone)]
pub struct IngestionBatch {
    pub batch_id: Uuid,
    pub client_id: String,
    pub file_name: String,
    pub accepted: Vec<NormalizedMember>,
    pub rejected: Vec<RejectedRow>,
    pub total_rows_read: usize,
    /// Set only when at least one row was rejected
    pub quarantine_path: Option<PathBuf>,
}

impl IngestionBatch {
    pub fn valid_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// Every row read ended up in exactly one partition
    pub fn is_consistent(&self) -> bool {
        self.valid_count() + self.rejected_count() == self.total_rows_read
    }
}

/// `<root>/<client_id>/rejected_<yymmdd_HHMMSS>_<batch8>.csv`
pub fn quarantine_file_path(root: &Path, client_id: &str, batch_id: &Uuid) -> PathBuf {
    root.join(client_id).join(format!(
        "rejected_{}_{}.csv",
        Utc::now().format(constants::FILE_TIMESTAMP_FORMAT),
        constants::short_batch_id(batch_id)
    ))
}

pub struct BatchProcessor {
    validator: RecordValidator,
    quarantine: Box<dyn QuarantineSink>,
}

impl BatchProcessor {
    pub fn new(validator: RecordValidator, quarantine: Box<dyn QuarantineSink>) -> Self {
        Self {
            validator,
            quarantine,
        }
    }

    /// Processor with the default member schema
    pub fn with_default_validator(quarantine: Box<dyn QuarantineSink>) -> Self {
        Self::new(RecordValidator::default(), quarantine)
    }

    /// Validate every row of `file_path` and quarantine the failures.
    ///
    /// File-level problems (unreadable file, missing header, undecodable
    /// record, quarantine write failure) abort the whole batch. The client id
    /// names the quarantine directory, so it must be one plain path component.
    pub fn process(
        &self,
        client_id: &str,
        file_path: &Path,
        file_name: &str,
    ) -> Result<IngestionBatch, BatchError> {
        if !is_valid_client_id(client_id) {
            ValidationMetrics::record_batch_failed();
            return Err(BatchError::InvalidClientId(client_id.to_string()));
        }
        let batch_id = Uuid::new_v4();
        let span = info_span!("process_batch", %batch_id, client_id, file_name);
        let _enter = span.enter();
        let started = Instant::now();

        let result = self.process_rows(batch_id, client_id, file_path, file_name);
        match &result {
            Ok(batch) => {
                ValidationMetrics::record_batch_processed(
                    batch.total_rows_read,
                    started.elapsed().as_secs_f64(),
                );
                info!(
                    total = batch.total_rows_read,
                    valid = batch.valid_count(),
                    rejected = batch.rejected_count(),
                    "Batch processed"
                );
            }
            Err(e) => {
                ValidationMetrics::record_batch_failed();
                error!("Batch aborted: {}", e);
            }
        }
        result
    }

    fn process_rows(
        &self,
        batch_id: Uuid,
        client_id: &str,
        file_path: &Path,
        file_name: &str,
    ) -> Result<IngestionBatch, BatchError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(file_path)
            .map_err(|source| BatchError::Open {
                path: file_path.to_path_buf(),
                source,
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| BatchError::Malformed {
                path: file_path.to_path_buf(),
                line: 0,
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(BatchError::MissingHeader {
                path: file_path.to_path_buf(),
            });
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        let mut total_rows_read = 0;

        for (index, record) in reader.records().enumerate() {
            let line = index + 1;
            let record = record.map_err(|source| BatchError::Malformed {
                path: file_path.to_path_buf(),
                line,
                source,
            })?;
            total_rows_read += 1;

            // Short rows leave trailing columns absent; extra cells are dropped
            let raw = RawRow::new(
                line,
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.clone(), v.to_string()))
                    .collect(),
            );

            match self.validator.validate(&raw) {
                Ok(member) => {
                    ValidationMetrics::record_row_accepted();
                    accepted.push(member);
                }
                Err(errors) => {
                    ValidationMetrics::record_row_rejected();
                    for e in &errors {
                        ValidationMetrics::record_field_error(e.field);
                    }
                    let row = RejectedRow {
                        client_id: client_id.to_string(),
                        file_name: file_name.to_string(),
                        raw,
                        errors,
                    };
                    debug!(line, errors = %row.error_message(), "Row rejected");
                    rejected.push(row);
                }
            }
        }

        let quarantine_path = if rejected.is_empty() {
            None
        } else {
            let path = quarantine_file_path(self.quarantine.root(), client_id, &batch_id);
            self.quarantine
                .write_rejected(&path, &rejected)
                .map_err(|message| BatchError::Quarantine {
                    path: path.clone(),
                    message,
                })?;
            ValidationMetrics::record_quarantine_written();
            warn!(
                rejected = rejected.len(),
                path = %path.display(),
                "Rejected rows quarantined"
            );
            Some(path)
        };

        Ok(IngestionBatch {
            batch_id,
            client_id: client_id.to_string(),
            file_name: file_name.to_string(),
            accepted,
            rejected,
            total_rows_read,
            quarantine_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemberField;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::{NamedTempFile, TempDir};

    /// Captures what would have been written instead of touching disk
    struct RecordingSink {
        root: PathBuf,
        written: Arc<Mutex<Vec<(PathBuf, Vec<RejectedRow>)>>>,
    }

    impl QuarantineSink for RecordingSink {
        fn write_rejected(&self, path: &Path, rows: &[RejectedRow]) -> Result<(), String> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), rows.to_vec()));
            Ok(())
        }

        fn root(&self) -> &Path {
            &self.root
        }
    }

    struct FailingSink(PathBuf);

    impl QuarantineSink for FailingSink {
        fn write_rejected(&self, _path: &Path, _rows: &[RejectedRow]) -> Result<(), String> {
            Err("disk full".to_string())
        }

        fn root(&self) -> &Path {
            &self.0
        }
    }

    fn recording_processor() -> (BatchProcessor, Arc<Mutex<Vec<(PathBuf, Vec<RejectedRow>)>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            root: PathBuf::from("quarantine"),
            written: written.clone(),
        };
        (
            BatchProcessor::with_default_validator(Box::new(sink)),
            written,
        )
    }

    fn roster(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const HEADER: &str = "member_id,first_name,last_name,dob,gender,phone,email,zip5,plan_id";

    #[test]
    fn test_rows_partitioned_between_accepted_and_rejected() {
        let file = roster(&format!(
            "{HEADER}\n\
             1,John,Doe,1980-01-15,M,555-123-4567,john@example.com,94105,PLAN_A\n\
             2,Jane,,1990-02-02,F,5551234567,,94105,PLAN_A\n\
             3,Ann,Lee,1975-12-31,o,(555) 987-6543,,10001,PLAN_B\n\
             4,Bob,Ray,not-a-date,M,123,,1,PLAN_B\n"
        ));
        let (processor, written) = recording_processor();

        let batch = processor.process("client1", file.path(), "members.csv").unwrap();

        assert_eq!(batch.total_rows_read, 4);
        assert_eq!(batch.valid_count(), 2);
        assert_eq!(batch.rejected_count(), 2);
        assert!(batch.is_consistent());
        assert_eq!(batch.accepted[0].member_id(), "1");
        assert_eq!(batch.accepted[1].member_id(), "3");

        let gate = &batch.rejected[0];
        assert_eq!(gate.raw.line(), 2);
        assert_eq!(gate.error_message(), "last_name: last_name is required");

        let full = &batch.rejected[1];
        assert_eq!(
            full.errors.iter().map(|e| e.field).collect::<Vec<_>>(),
            vec![MemberField::Dob, MemberField::Phone, MemberField::Zip5]
        );

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(Some(written[0].0.clone()), batch.quarantine_path);
        assert!(written[0].0.starts_with("quarantine/client1"));
        assert_eq!(written[0].1.len(), 2);
    }

    #[test]
    fn test_no_rejections_writes_no_quarantine() {
        let file = roster(&format!(
            "{HEADER}\n1,John,Doe,1980-01-15,M,555-123-4567,,94105,PLAN_A\n"
        ));
        let (processor, written) = recording_processor();

        let batch = processor.process("client1", file.path(), "members.csv").unwrap();

        assert_eq!(batch.valid_count(), 1);
        assert!(batch.quarantine_path.is_none());
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_short_rows_and_blank_lines() {
        // Row 2 stops before email/zip5/plan_id, so those are absent
        let file = roster(&format!(
            "{HEADER}\n\n1,John,Doe,1980-01-15,M,555-123-4567,,94105,PLAN_A,extra\n2,Jane,Roe\n"
        ));
        let (processor, _) = recording_processor();

        let batch = processor.process("client1", file.path(), "members.csv").unwrap();

        assert_eq!(batch.total_rows_read, 2);
        assert_eq!(batch.valid_count(), 1);
        let rejected = &batch.rejected[0];
        assert_eq!(rejected.raw.get("email"), None);
        assert!(rejected
            .error_strings()
            .contains(&"plan_id: plan_id is required".to_string()));
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let file = roster(
            " member_id , first_name,last_name ,dob,gender,phone,zip_code,plan_id\n\
             1,John,Doe,1980-01-15,M,555-123-4567,94105,PLAN_A\n",
        );
        let (processor, _) = recording_processor();

        let batch = processor.process("client1", file.path(), "members.csv").unwrap();

        assert_eq!(batch.valid_count(), 1);
        assert_eq!(batch.accepted[0].zip5(), "94105");
    }

    #[test]
    fn test_header_only_file_is_an_empty_batch() {
        let file = roster(&format!("{HEADER}\n"));
        let (processor, _) = recording_processor();

        let batch = processor.process("client1", file.path(), "members.csv").unwrap();

        assert_eq!(batch.total_rows_read, 0);
        assert!(batch.is_consistent());
    }

    #[test]
    fn test_empty_file_is_missing_header() {
        let file = roster("");
        let (processor, _) = recording_processor();

        let err = processor
            .process("client1", file.path(), "members.csv")
            .unwrap_err();
        assert!(matches!(err, BatchError::MissingHeader { .. }));
    }

    #[test]
    fn test_unreadable_file_is_a_batch_error() {
        let dir = TempDir::new().unwrap();
        let (processor, _) = recording_processor();

        let err = processor
            .process("client1", &dir.path().join("missing.csv"), "missing.csv")
            .unwrap_err();
        assert!(matches!(err, BatchError::Open { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(format!("{HEADER}\n").as_bytes()).unwrap();
        file.write_all(&[b'1', b',', 0xff, 0xfe, b'\n']).unwrap();
        let (processor, _) = recording_processor();

        let err = processor
            .process("client1", file.path(), "members.csv")
            .unwrap_err();
        assert!(matches!(err, BatchError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_quarantine_failure_aborts_batch() {
        let file = roster(&format!("{HEADER}\n1,John,,,,,,,\n"));
        let processor =
            BatchProcessor::with_default_validator(Box::new(FailingSink(PathBuf::from("q"))));

        let err = processor
            .process("client1", file.path(), "members.csv")
            .unwrap_err();
        assert!(matches!(err, BatchError::Quarantine { .. }));
    }

    #[test]
    fn test_client_id_cannot_leave_quarantine_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("data").join("rejected");
        let processor = BatchProcessor::with_default_validator(Box::new(
            crate::infra::CsvQuarantineWriter::new(&root),
        ));
        let file = roster(&format!("{HEADER}\n1,John,,,,,,,\n"));

        for bad in ["../../escaped", "..", "", "a/b"] {
            let err = processor.process(bad, file.path(), "r.csv").unwrap_err();
            assert!(matches!(err, BatchError::InvalidClientId(_)), "{bad:?}");
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!root.exists());
    }

    #[test]
    fn test_quarantine_file_name_shape() {
        let id = Uuid::new_v4();
        let path = quarantine_file_path(Path::new("data/rejected"), "acme", &id);
        let name = path.file_name().unwrap().to_str().unwrap();

        assert!(path.starts_with("data/rejected/acme"));
        assert!(name.starts_with("rejected_"));
        assert!(name.ends_with(&format!("_{}.csv", constants::short_batch_id(&id))));
    }
}
