//! Execution pipeline: drives the fetch tool for one admitted job and hands the
//! artifact to the delivery transport.

mod artifact;
mod error;
mod executor;
mod staging;

pub use error::PipelineError;
pub use executor::{Delivered, ExecutionPipeline};
pub use staging::StagingScope;
