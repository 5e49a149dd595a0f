use std::path::{Path, PathBuf};

use crate::domain::NormalizedMember;
use crate::error::{AuditError, StorageError};
use crate::pipeline::audit::AuditRecord;
use crate::pipeline::processing::batch::RejectedRow;
use crate::pipeline::storage::AuditLogRow;

/// Persistence of accepted members and the audit table
pub trait MemberStore {
    /// Insert or update every member of one batch; last write wins per
    /// `(member_id, client_id)`. Returns the number of rows written.
    fn upsert_members(
        &mut self,
        client_id: &str,
        members: &[NormalizedMember],
    ) -> Result<usize, StorageError>;

    /// Append one audit row; returns its id
    fn insert_audit_log(&mut self, row: &AuditLogRow) -> Result<i64, StorageError>;
}

/// Destination for one batch's audit document
pub trait AuditSink {
    fn write_audit(&self, record: &AuditRecord) -> Result<PathBuf, AuditError>;
}

/// Destination for one batch's rejected rows
pub trait QuarantineSink {
    /// Write every rejected row of a batch into `path`
    fn write_rejected(&self, path: &Path, rows: &[RejectedRow]) -> Result<(), String>;

    /// Root under which per-client quarantine files are placed
    fn root(&self) -> &Path;
}
