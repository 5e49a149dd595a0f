// Pipeline processing: field normalization, row validation, and batch routing

pub mod batch;
pub mod normalize;
pub mod validate;

pub use batch::{BatchProcessor, IngestionBatch, RejectedRow};
pub use validate::{FieldError, RecordValidator};
