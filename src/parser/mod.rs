mod batcher;
mod row_reader;

// Re-export public API
pub use batcher::{BatchExt, Batches, TryBatches};
pub use row_reader::{MalformedRowPolicy, RowReader};
