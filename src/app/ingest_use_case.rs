use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use crate::app::ports::{AuditSink, MemberStore};
use crate::config::PathsConfig;
use crate::error::Result;
use crate::infra::{CsvQuarantineWriter, JsonAuditWriter};
use crate::pipeline::audit::{reconcile, AuditRecord};
use crate::pipeline::ingestion::{IngestionMetadata, LocalObjectStore};
use crate::pipeline::processing::{BatchProcessor, IngestionBatch};
use crate::pipeline::storage::AuditLogRow;

/// Everything one ingestion run produced
#[derive(Debug)]
pub struct IngestOutcome {
    pub metadata: IngestionMetadata,
    pub batch: IngestionBatch,
    pub audit: AuditRecord,
    pub audit_path: PathBuf,
    pub audit_id: i64,
}

/// Use case for ingesting one client roster end to end:
/// upload, validate, persist, reconcile, audit
pub struct IngestUseCase<S: MemberStore> {
    object_store: LocalObjectStore,
    processor: BatchProcessor,
    audit_sink: Box<dyn AuditSink>,
    store: S,
}

impl<S: MemberStore> IngestUseCase<S> {
    pub fn new(
        object_store: LocalObjectStore,
        processor: BatchProcessor,
        audit_sink: Box<dyn AuditSink>,
        store: S,
    ) -> Self {
        Self {
            object_store,
            processor,
            audit_sink,
            store,
        }
    }

    /// Wire the file-based adapters from configured paths
    pub fn from_paths(paths: &PathsConfig, store: S) -> Self {
        Self::new(
            LocalObjectStore::new(&paths.raw_root),
            BatchProcessor::with_default_validator(Box::new(CsvQuarantineWriter::new(
                &paths.quarantine_root,
            ))),
            Box::new(JsonAuditWriter::new(&paths.audit_root)),
            store,
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one client file through the whole pipeline.
    ///
    /// A file-level failure stops the run before anything is persisted; a
    /// failed member write stops it before the audit record is produced.
    /// The audit document is written before its audit log row, so a failed
    /// row insert leaves the document on disk with no matching row.
    pub fn run(&mut self, client_id: &str, source_path: &Path) -> Result<IngestOutcome> {
        let span = info_span!("ingest", client_id, source = %source_path.display());
        let _enter = span.enter();

        let metadata = self.object_store.upload_file(client_id, source_path)?;

        let batch = self
            .processor
            .process(client_id, &metadata.local_path, &metadata.file_name)?;
        debug_assert!(batch.is_consistent());

        self.store.upsert_members(client_id, &batch.accepted)?;

        let audit = reconcile(&batch, &metadata);
        let audit_path = self.audit_sink.write_audit(&audit)?;
        let audit_id = self.store.insert_audit_log(&AuditLogRow::from(&audit))?;

        if batch.rejected_count() > 0 {
            warn!(
                rejected = batch.rejected_count(),
                "Ingestion finished with rejected rows"
            );
        }
        info!(
            batch_id = %batch.batch_id,
            valid = audit.valid_row_count,
            rejected = audit.rejected_row_count,
            audit_id,
            "Ingestion complete"
        );

        Ok(IngestOutcome {
            metadata,
            batch,
            audit,
            audit_path,
            audit_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NormalizedMember;
    use crate::error::{IngestError, StorageError};
    use crate::pipeline::storage::InMemoryMemberStore;
    use std::fs;
    use tempfile::TempDir;

    const ROSTER: &str = "member_id,first_name,last_name,dob,gender,phone,email,zip5,plan_id\n\
        1,John,Doe,1980-01-15,M,555-123-4567,john@example.com,94105,PLAN_A\n\
        2,Jane,,1990-02-02,F,5551234567,,94105,PLAN_A\n";

    #[test]
    fn test_run_persists_and_audits() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("members.csv");
        fs::write(&source, ROSTER).unwrap();
        let paths = PathsConfig::rooted_at(&dir.path().join("data"));
        let mut use_case = IngestUseCase::from_paths(&paths, InMemoryMemberStore::new());

        let outcome = use_case.run("acme", &source).unwrap();

        assert_eq!(outcome.audit.valid_row_count, 1);
        assert_eq!(outcome.audit.rejected_row_count, 1);
        assert!(outcome.audit_path.exists());
        assert!(outcome.batch.quarantine_path.as_ref().unwrap().exists());

        let store = use_case.store();
        assert_eq!(store.member_count(), 1);
        assert_eq!(store.audit_rows().len(), 1);
        assert_eq!(store.audit_rows()[0].invalid_rows(), 1);
    }

    /// Accepts members but refuses every audit log row
    #[derive(Default)]
    struct RejectingAuditStore {
        members: usize,
    }

    impl MemberStore for RejectingAuditStore {
        fn upsert_members(
            &mut self,
            _client_id: &str,
            members: &[NormalizedMember],
        ) -> std::result::Result<usize, StorageError> {
            self.members += members.len();
            Ok(members.len())
        }

        fn insert_audit_log(
            &mut self,
            _row: &AuditLogRow,
        ) -> std::result::Result<i64, StorageError> {
            Err(StorageError::InvalidStoredValue {
                column: "batch_id",
                value: "rejected".to_string(),
            })
        }
    }

    #[test]
    fn test_failed_audit_row_leaves_audit_document() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("members.csv");
        fs::write(&source, ROSTER).unwrap();
        let paths = PathsConfig::rooted_at(&dir.path().join("data"));
        let mut use_case = IngestUseCase::from_paths(&paths, RejectingAuditStore::default());

        let err = use_case.run("acme", &source).unwrap_err();

        assert!(matches!(err, IngestError::Storage(_)));
        assert_eq!(use_case.store().members, 1);
        let documents: Vec<_> = fs::read_dir(&paths.audit_root).unwrap().collect();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn test_missing_source_stops_before_persistence() {
        let dir = TempDir::new().unwrap();
        let paths = PathsConfig::rooted_at(dir.path());
        let mut use_case = IngestUseCase::from_paths(&paths, InMemoryMemberStore::new());

        let err = use_case
            .run("acme", &dir.path().join("missing.csv"))
            .unwrap_err();

        assert!(matches!(err, IngestError::Upload(_)));
        assert!(use_case.store().audit_rows().is_empty());
    }
}
