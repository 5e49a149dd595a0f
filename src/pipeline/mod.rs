// Data pipeline: ingestion, processing, audit, and storage

pub mod audit;
pub mod ingestion;
pub mod processing;
pub mod storage;
