//! Two-lane durable priority queue for submitted jobs.

mod sqlite;
mod traits;

pub use sqlite::SqliteJobQueue;
pub use traits::{JobQueue, Lane, QueueError};
