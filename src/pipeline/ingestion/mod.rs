// Pipeline ingestion: client files into the raw object area with checksums

pub mod object_store;

pub use object_store::{is_valid_client_id, IngestionMetadata, LocalObjectStore, StoredObject};
