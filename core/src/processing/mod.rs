pub mod batch;

pub use batch::{BatchProcessor, BatchReport};
