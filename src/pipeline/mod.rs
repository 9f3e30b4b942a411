pub mod filter;
pub mod processor;
pub mod report;

pub use processor::{run, ProcessingError, RunConfig};
