//! Audit reconciliation: one immutable record per processed batch.
//!
//! Counts always come from the batch partitions themselves, never from a
//! separately maintained tally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::constants;
use crate::pipeline::ingestion::IngestionMetadata;
use crate::pipeline::processing::IngestionBatch;

/// Compliance attestation attached to every audit record.
///
/// This is a static declaration about how the deployment is operated. Nothing
/// here is checked at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplianceAttestation {
    pub hipaa_compliant: bool,
    pub data_encrypted: bool,
    pub audit_trail_maintained: bool,
}

impl ComplianceAttestation {
    pub const DECLARED: ComplianceAttestation = ComplianceAttestation {
        hipaa_compliant: true,
        data_encrypted: true,
        audit_trail_maintained: true,
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub event_type: String,
    pub batch_id: Uuid,
    /// When this record was created
    pub timestamp: DateTime<Utc>,
    pub client_id: String,
    pub file_name: String,
    /// When the source file was stored
    pub ingestion_time: DateTime<Utc>,
    pub checksum: String,
    pub file_size: u64,
    pub valid_row_count: usize,
    pub rejected_row_count: usize,
    pub total_row_processed: usize,
    pub quarantine_file: Option<PathBuf>,
    pub compliance: ComplianceAttestation,
}

/// Build the audit record for a processed batch.
///
/// Identity (`client_id`, `file_name`) comes from the batch; provenance
/// (`ingestion_time`, `checksum`, `file_size`) from the upload metadata.
pub fn reconcile(batch: &IngestionBatch, metadata: &IngestionMetadata) -> AuditRecord {
    let valid_row_count = batch.accepted.len();
    let rejected_row_count = batch.rejected.len();

    AuditRecord {
        event_type: constants::AUDIT_EVENT_INGESTION.to_string(),
        batch_id: batch.batch_id,
        timestamp: Utc::now(),
        client_id: batch.client_id.clone(),
        file_name: batch.file_name.clone(),
        ingestion_time: metadata.ingestion_time,
        checksum: metadata.checksum.clone(),
        file_size: metadata.file_size,
        valid_row_count,
        rejected_row_count,
        total_row_processed: valid_row_count + rejected_row_count,
        quarantine_file: batch.quarantine_path.clone(),
        compliance: ComplianceAttestation::DECLARED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MemberField, RawRow};
    use crate::pipeline::processing::{FieldError, RejectedRow};

    fn metadata() -> IngestionMetadata {
        IngestionMetadata {
            client_id: "acme".to_string(),
            file_name: "members.csv".to_string(),
            local_path: PathBuf::from("data/raw/acme/250101_000000_members.csv"),
            ingestion_time: Utc::now(),
            checksum: "abc123".to_string(),
            file_size: 42,
        }
    }

    fn rejected_row() -> RejectedRow {
        RejectedRow {
            client_id: "acme".to_string(),
            file_name: "members.csv".to_string(),
            raw: RawRow::from_pairs(1, [("member_id", "")]),
            errors: vec![FieldError::new(MemberField::MemberId, "member_id is required")],
        }
    }

    fn batch(rejected: usize, quarantine: Option<&str>) -> IngestionBatch {
        IngestionBatch {
            batch_id: Uuid::new_v4(),
            client_id: "acme".to_string(),
            file_name: "members.csv".to_string(),
            accepted: Vec::new(),
            rejected: (0..rejected).map(|_| rejected_row()).collect(),
            total_rows_read: rejected,
            quarantine_path: quarantine.map(PathBuf::from),
        }
    }

    #[test]
    fn test_counts_come_from_partitions() {
        let batch = batch(3, Some("data/rejected/acme/r.csv"));
        let record = reconcile(&batch, &metadata());

        assert_eq!(record.event_type, "ingestion");
        assert_eq!(record.batch_id, batch.batch_id);
        assert_eq!(record.valid_row_count, 0);
        assert_eq!(record.rejected_row_count, 3);
        assert_eq!(record.total_row_processed, 3);
        assert_eq!(record.checksum, "abc123");
        assert_eq!(record.file_size, 42);
        assert_eq!(
            record.quarantine_file,
            Some(PathBuf::from("data/rejected/acme/r.csv"))
        );
    }

    #[test]
    fn test_empty_batch_reconciles_to_zero() {
        let record = reconcile(&batch(0, None), &metadata());
        assert_eq!(record.total_row_processed, 0);
        assert!(record.quarantine_file.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let record = reconcile(&batch(1, None), &metadata());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["compliance"]["hipaa_compliant"], true);
        assert_eq!(json["compliance"]["data_encrypted"], true);
        assert_eq!(json["compliance"]["audit_trail_maintained"], true);
        assert!(json["timestamp"].is_string());
        assert!(json["ingestion_time"].is_string());
        assert!(json["quarantine_file"].is_null());
    }
}
