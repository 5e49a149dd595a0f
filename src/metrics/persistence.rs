//! Persistence phase metrics: member upserts and audit records

use crate::metrics::{phase_metric, PhaseMetrics};

pub struct PersistenceMetrics;

impl PersistenceMetrics {
    pub fn record_members_upserted(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "persistence", "members_upserted"))
            .increment(count as u64);
    }

    pub fn record_upsert_error() {
        ::metrics::counter!(phase_metric!(counter, "persistence", "upsert_errors")).increment(1);
    }

    pub fn record_audit_written() {
        ::metrics::counter!(phase_metric!(counter, "persistence", "audit_records")).increment(1);
    }
}

impl PhaseMetrics for PersistenceMetrics {
    fn register_metrics() {
        use metrics::describe_counter;

        describe_counter!(
            phase_metric!(counter, "persistence", "members_upserted"),
            "Total number of member rows inserted or updated"
        );
        describe_counter!(
            phase_metric!(counter, "persistence", "upsert_errors"),
            "Total number of batches whose member write failed"
        );
        describe_counter!(
            phase_metric!(counter, "persistence", "audit_records"),
            "Total number of audit records written to file and table"
        );
    }

    fn phase_name() -> &'static str {
        "persistence"
    }
}
