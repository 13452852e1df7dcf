pub mod error;
pub mod queue;
pub mod report;
pub mod stress;
