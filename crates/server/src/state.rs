use std::sync::Arc;

use grabber_core::{
    Config, JobQueue, PendingRequestStore, PreferenceStore, SanitizedConfig, WorkerPool,
};

/// Shared application state
pub struct AppState {
    config: Config,
    queue: Arc<dyn JobQueue>,
    pool: Arc<WorkerPool>,
    pending: PendingRequestStore,
    preferences: PreferenceStore,
}

impl AppState {
    pub fn new(
        config: Config,
        queue: Arc<dyn JobQueue>,
        pool: Arc<WorkerPool>,
        pending: PendingRequestStore,
        preferences: PreferenceStore,
    ) -> Self {
        Self {
            config,
            queue,
            pool,
            pending,
            preferences,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn queue(&self) -> &dyn JobQueue {
        self.queue.as_ref()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn pending(&self) -> &PendingRequestStore {
        &self.pending
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }
}
