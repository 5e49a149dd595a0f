// File-based adapters behind the application ports

pub mod audit_json_adapter;
pub mod quarantine_csv_adapter;

pub use audit_json_adapter::JsonAuditWriter;
pub use quarantine_csv_adapter::CsvQuarantineWriter;
