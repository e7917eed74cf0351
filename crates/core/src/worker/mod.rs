//! Worker pool: dispatch loops that pull jobs, consult the resource gate, and run
//! the execution pipeline.

mod config;
mod pool;
mod types;

pub use config::WorkerConfig;
pub use pool::WorkerPool;
pub use types::{InFlightJob, PoolStatus};
