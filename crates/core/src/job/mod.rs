//! Job model: the immutable fetch request and its lifecycle state machine.

mod state;
mod types;

pub use state::{JobState, JobTracker, RejectedResource};
pub use types::{Job, JobId, MediaKind, ParseValueError, Priority, Quality, RequesterId};
