// Pipeline storage: accepted members, the audit table, and analytics queries

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryMemberStore;
pub use sqlite::SqliteMemberStore;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::NormalizedMember;
use crate::pipeline::audit::AuditRecord;

/// One row of the `audit_log` table.
///
/// Only obtainable from an [`AuditRecord`], so table counts always match the
/// audit document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogRow {
    client_id: String,
    file_name: String,
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    ingestion_time: DateTime<Utc>,
}

impl AuditLogRow {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn valid_rows(&self) -> usize {
        self.valid_rows
    }

    pub fn invalid_rows(&self) -> usize {
        self.invalid_rows
    }

    pub fn ingestion_time(&self) -> DateTime<Utc> {
        self.ingestion_time
    }
}

impl From<&AuditRecord> for AuditLogRow {
    fn from(record: &AuditRecord) -> Self {
        Self {
            client_id: record.client_id.clone(),
            file_name: record.file_name.clone(),
            total_rows: record.total_row_processed,
            valid_rows: record.valid_row_count,
            invalid_rows: record.rejected_row_count,
            ingestion_time: record.ingestion_time,
        }
    }
}

/// A persisted `audit_log` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub audit_id: i64,
    pub client_id: String,
    pub file_name: String,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub invalid_rows: i64,
    pub ingestion_time: String,
}

/// A persisted member with its ownership and freshness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMember {
    pub client_id: String,
    pub member: NormalizedMember,
    pub ingestion_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientMemberCount {
    pub client_id: String,
    pub unique_members: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipMemberCount {
    pub zip5: String,
    pub member_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientErrorRate {
    pub client_id: String,
    /// Rejected rows over total rows across every batch of the client
    pub error_rate: f64,
}
