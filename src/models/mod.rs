//! Domain models shared across the pipeline.

pub mod payload;
pub mod record;

pub use payload::{DatasetType, Payload, TestCase};
pub use record::{AccuracyRow, CategoryCoverageRow, DatasetCountRow, ResultRecord};
