pub mod core;

pub use crate::core::error::{QueueError, ReportError};
pub use crate::core::queue::ConcurrentQueue;
