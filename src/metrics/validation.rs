//! Validation phase metrics: row outcomes and batch results

use crate::domain::MemberField;
use crate::metrics::{phase_metric, PhaseMetrics};

pub struct ValidationMetrics;

impl ValidationMetrics {
    pub fn record_row_accepted() {
        ::metrics::counter!(phase_metric!(counter, "validation", "rows_accepted")).increment(1);
    }

    pub fn record_row_rejected() {
        ::metrics::counter!(phase_metric!(counter, "validation", "rows_rejected")).increment(1);
    }

    /// One violated rule, labelled by field
    pub fn record_field_error(field: MemberField) {
        ::metrics::counter!(
            phase_metric!(counter, "validation", "field_errors"),
            "field" => field.as_str()
        )
        .increment(1);
    }

    pub fn record_batch_processed(total_rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "validation", "batches_processed")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "validation", "batch_rows"))
            .record(total_rows as f64);
        ::metrics::histogram!(phase_metric!(
            histogram,
            "validation",
            "batch_duration_seconds"
        ))
        .record(duration_secs);
    }

    pub fn record_batch_failed() {
        ::metrics::counter!(phase_metric!(counter, "validation", "batches_failed")).increment(1);
    }

    pub fn record_quarantine_written() {
        ::metrics::counter!(phase_metric!(counter, "validation", "quarantine_files")).increment(1);
    }
}

impl PhaseMetrics for ValidationMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_histogram};

        describe_counter!(
            phase_metric!(counter, "validation", "rows_accepted"),
            "Total number of roster rows accepted"
        );
        describe_counter!(
            phase_metric!(counter, "validation", "rows_rejected"),
            "Total number of roster rows quarantined"
        );
        describe_counter!(
            phase_metric!(counter, "validation", "field_errors"),
            "Total number of field rule violations, by field"
        );
        describe_counter!(
            phase_metric!(counter, "validation", "batches_processed"),
            "Total number of roster files processed"
        );
        describe_counter!(
            phase_metric!(counter, "validation", "batches_failed"),
            "Total number of roster files aborted by a file-level error"
        );
        describe_counter!(
            phase_metric!(counter, "validation", "quarantine_files"),
            "Total number of quarantine reports written"
        );
        describe_histogram!(
            phase_metric!(histogram, "validation", "batch_rows"),
            "Rows read per roster file"
        );
        describe_histogram!(
            phase_metric!(histogram, "validation", "batch_duration_seconds"),
            "Time spent validating one roster file in seconds"
        );
    }

    fn phase_name() -> &'static str {
        "validation"
    }
}
