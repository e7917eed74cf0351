pub mod config;
pub mod delivery;
pub mod fetcher;
pub mod gate;
pub mod job;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod testing;
pub mod worker;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use delivery::{DeliveryError, DeliveryTransport, Notice};
pub use fetcher::{FetchError, FetchFailureKind, FetchTool, FetcherConfig, YtDlp};
pub use gate::{
    Admission, MemoryProbe, ResourceGate, SysfsThermalMonitor, SystemMemoryProbe, ThermalProbe,
};
pub use job::{Job, JobId, JobState, MediaKind, Priority, Quality, RequesterId};
pub use pipeline::{ExecutionPipeline, PipelineError};
pub use queue::{JobQueue, Lane, QueueError, SqliteJobQueue};
pub use store::{
    PendingRequest, PendingRequestStore, Preference, PreferenceStore, SqliteKvStore, StoreError,
};
pub use worker::{PoolStatus, WorkerConfig, WorkerPool};
