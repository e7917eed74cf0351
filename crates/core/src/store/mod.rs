//! TTL-bound key/value stores: pending requests and requester preferences.

mod kv;
mod pending;
mod preferences;

pub use kv::{SqliteKvStore, StoreError};
pub use pending::{PendingRequest, PendingRequestStore, DEFAULT_PENDING_TTL};
pub use preferences::{Preference, PreferenceStore, DEFAULT_PREFERENCE_TTL};
