//! Ingestion phase metrics: client files copied into the raw object area

use crate::metrics::{phase_metric, PhaseMetrics};

pub struct IngestionMetrics;

impl IngestionMetrics {
    /// Record a client file stored with its checksum
    pub fn record_file_uploaded(file_bytes: u64) {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "files_uploaded")).increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "ingestion", "file_bytes"))
            .record(file_bytes as f64);
    }

    pub fn record_upload_error() {
        ::metrics::counter!(phase_metric!(counter, "ingestion", "upload_errors")).increment(1);
    }
}

impl PhaseMetrics for IngestionMetrics {
    fn register_metrics() {
        use metrics::{describe_counter, describe_histogram};

        describe_counter!(
            phase_metric!(counter, "ingestion", "files_uploaded"),
            "Total number of client files copied into raw storage"
        );
        describe_counter!(
            phase_metric!(counter, "ingestion", "upload_errors"),
            "Total number of client files that could not be stored"
        );
        describe_histogram!(
            phase_metric!(histogram, "ingestion", "file_bytes"),
            "Size of uploaded client files in bytes"
        );
    }

    fn phase_name() -> &'static str {
        "ingestion"
    }
}
