/// Column names and filesystem defaults shared across the pipeline.
/// Error messages live next to the normalizers that produce them.

// Column names as they appear in client roster headers
pub const MEMBER_ID: &str = "member_id";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const DOB: &str = "dob";
pub const GENDER: &str = "gender";
pub const PHONE: &str = "phone";
pub const EMAIL: &str = "email";
pub const ZIP5: &str = "zip5";
pub const PLAN_ID: &str = "plan_id";

// Some clients send the zip column under its long name
pub const ZIP_CODE_ALIAS: &str = "zip_code";

// Quarantine report header
pub const QUARANTINE_ROW_DATA: &str = "row_data";
pub const QUARANTINE_ERROR_MESSAGE: &str = "error_message";

/// Separator used when joining a rejected row's errors into one cell
pub const ERROR_JOIN_SEPARATOR: &str = "; ";

/// Timestamp pattern used in stored object, quarantine and audit file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%y%m%d_%H%M%S";

// Default locations under the data directory
pub const DEFAULT_DATA_DIR: &str = "data";
pub const RAW_DIR: &str = "raw";
pub const REJECTED_DIR: &str = "rejected";
pub const AUDIT_DIR: &str = "audit";
pub const DATABASE_FILE: &str = "member_ingest.db";

/// Audit event type recorded for every batch
pub const AUDIT_EVENT_INGESTION: &str = "ingestion";

/// First eight characters of a batch id, used to keep file names unique within a second
pub fn short_batch_id(batch_id: &uuid::Uuid) -> String {
    batch_id.simple().to_string()[..8].to_string()
}
