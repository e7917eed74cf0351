//! Fixed-size pool of dispatch loops over the job queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::WorkerConfig;
use super::types::{InFlightJob, PoolStatus};
use crate::delivery::{DeliveryTransport, Notice};
use crate::gate::{Admission, ResourceGate};
use crate::job::{Job, JobState, JobTracker, RejectedResource};
use crate::metrics;
use crate::pipeline::{ExecutionPipeline, PipelineError};
use crate::queue::{JobQueue, Lane, QueueError};

#[derive(Default)]
struct PoolStats {
    processed: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// State shared by every worker loop.
struct Shared {
    config: WorkerConfig,
    queue: Arc<dyn JobQueue>,
    gate: Arc<ResourceGate>,
    pipeline: Arc<ExecutionPipeline>,
    transport: Arc<dyn DeliveryTransport>,
    admission: Arc<Semaphore>,
    tracker: JobTracker,
    stats: PoolStats,
    cancel: CancellationToken,
}

/// Decrements the in-flight gauge when a job is done with.
struct InFlightGuard;

impl InFlightGuard {
    fn new() -> Self {
        metrics::JOBS_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics::JOBS_IN_FLIGHT.dec();
    }
}

/// Pulls jobs from the queue and runs them, one job per worker at a time.
///
/// A pool runs once: after [`WorkerPool::shutdown`] it cannot be started again.
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl WorkerPool {
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn JobQueue>,
        gate: Arc<ResourceGate>,
        pipeline: Arc<ExecutionPipeline>,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Self {
        let admission = Arc::new(Semaphore::new(config.admission_capacity()));
        Self {
            shared: Arc::new(Shared {
                config,
                queue,
                gate,
                pipeline,
                transport,
                admission,
                tracker: JobTracker::new(),
                stats: PoolStats::default(),
                cancel: CancellationToken::new(),
            }),
            handles: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Semaphore bounding concurrent request handling across the process.
    pub fn admission(&self) -> Arc<Semaphore> {
        Arc::clone(&self.shared.admission)
    }

    /// Token cancelled when the pool shuts down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueue a job for processing.
    pub fn submit(&self, job: &Job) -> Result<(), QueueError> {
        self.shared.queue.enqueue(job)?;

        let lane = Lane::for_priority(job.priority);
        metrics::JOBS_SUBMITTED
            .with_label_values(&[lane.as_str()])
            .inc();
        self.shared.sample_queue_depth();
        info!(
            job_id = %job.id,
            requester = job.requester_id,
            lane = lane.as_str(),
            "Job submitted"
        );
        Ok(())
    }

    /// Spawn the worker loops.
    pub async fn start(&self) {
        if self.shared.cancel.is_cancelled() {
            warn!("Worker pool was shut down and cannot be restarted");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Worker pool already running");
            return;
        }

        let mut handles = self.handles.lock().await;
        for worker_id in 0..self.shared.config.count {
            let shared = Arc::clone(&self.shared);
            handles.push(tokio::spawn(async move {
                shared.worker_loop(worker_id).await;
            }));
        }
        info!(
            workers = self.shared.config.count,
            admission_capacity = self.shared.config.admission_capacity(),
            "Worker pool started"
        );
    }

    /// Stop dequeuing, cancel in-flight work, and wait for the loops to exit.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            self.shared.cancel.cancel();
            return;
        }

        info!("Shutting down worker pool");
        self.shared.cancel.cancel();

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let grace = self.shared.config.shutdown_grace();

        if tokio::time::timeout(grace, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(grace_ms = grace.as_millis() as u64, "Workers did not stop in time, aborting");
            for abort in aborts {
                abort.abort();
            }
        }
        info!("Worker pool stopped");
    }

    pub fn status(&self) -> PoolStatus {
        let stats = &self.shared.stats;
        PoolStatus {
            running: self.is_running(),
            worker_count: self.shared.config.count,
            admission_capacity: self.shared.config.admission_capacity(),
            admission_available: self.shared.admission.available_permits(),
            in_flight: self
                .shared
                .tracker
                .snapshot()
                .into_iter()
                .map(|(job_id, state)| InFlightJob { job_id, state })
                .collect(),
            total_processed: stats.processed.load(Ordering::Relaxed),
            total_delivered: stats.delivered.load(Ordering::Relaxed),
            total_failed: stats.failed.load(Ordering::Relaxed),
            total_rejected: stats.rejected.load(Ordering::Relaxed),
            queue_depth: self.shared.queue.status().ok(),
        }
    }
}

impl Shared {
    async fn worker_loop(&self, worker_id: usize) {
        debug!(worker_id, "Worker started");

        loop {
            // Jobs are only popped while a permit is held.
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.admission).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                break;
            };

            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.queue.dequeue(self.config.lane_timeout()) => next,
            };

            match next {
                Err(e) => {
                    drop(permit);
                    warn!(worker_id, error = %e, "Dequeue failed");
                    metrics::DEQUEUE_ERRORS
                        .with_label_values(&[queue_error_kind(&e)])
                        .inc();
                    if self.pause(self.config.error_backoff()).await {
                        break;
                    }
                }
                Ok(None) => {
                    drop(permit);
                    if self.pause(self.config.idle_backoff()).await {
                        break;
                    }
                }
                Ok(Some(job)) => {
                    metrics::JOBS_DEQUEUED
                        .with_label_values(&[Lane::for_priority(job.priority).as_str()])
                        .inc();
                    self.sample_queue_depth();

                    self.process_job(worker_id, job).await;
                    drop(permit);
                }
            }
        }

        debug!(worker_id, "Worker stopped");
    }

    /// Sleep for `duration`. Returns true if shutdown was requested meanwhile.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    fn sample_queue_depth(&self) {
        if let Ok(depth) = self.queue.status() {
            metrics::QUEUE_DEPTH.set(depth as i64);
        }
    }

    async fn process_job(&self, worker_id: usize, job: Job) {
        let _in_flight = InFlightGuard::new();
        self.tracker.begin(&job.id);

        match self.gate.admit() {
            Admission::Accept => {}
            Admission::RejectThermal => {
                self.reject(&job, RejectedResource::Thermal, Notice::Throttled)
                    .await;
                self.pause(self.config.thermal_pause()).await;
                return;
            }
            Admission::RejectMemory => {
                self.reject(&job, RejectedResource::Memory, Notice::LowMemory)
                    .await;
                return;
            }
        }

        self.tracker.transition(&job.id, JobState::Admitted);
        debug!(worker_id, job_id = %job.id, url = %job.url, "Job admitted");

        match self.pipeline.run(&job, &self.tracker, &self.cancel).await {
            Ok(delivered) => {
                self.tracker.transition(&job.id, JobState::Delivered);
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                metrics::JOBS_FINISHED
                    .with_label_values(&["delivered"])
                    .inc();
                info!(
                    worker_id,
                    job_id = %job.id,
                    file = %delivered.file_name,
                    "Job delivered"
                );
            }
            Err(PipelineError::Cancelled) => {
                self.tracker.transition(
                    &job.id,
                    JobState::Failed {
                        reason: PipelineError::Cancelled.reason().to_string(),
                    },
                );
                metrics::JOBS_FINISHED
                    .with_label_values(&["cancelled"])
                    .inc();
                info!(worker_id, job_id = %job.id, "Job abandoned on shutdown");
            }
            Err(e) => {
                let reason = e.reason();
                self.tracker.transition(
                    &job.id,
                    JobState::Failed {
                        reason: reason.to_string(),
                    },
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                metrics::JOBS_FINISHED.with_label_values(&[reason]).inc();
                error!(worker_id, job_id = %job.id, error = %e, "Job failed");

                if let Some(notice) = e.notice(job.media_kind) {
                    self.notify(&job, &notice).await;
                }
            }
        }

        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        self.tracker.finish(&job.id);
    }

    async fn reject(&self, job: &Job, resource: RejectedResource, notice: Notice) {
        let label = match resource {
            RejectedResource::Thermal => "thermal",
            RejectedResource::Memory => "memory",
        };
        warn!(job_id = %job.id, resource = label, "Job rejected by resource gate");

        self.tracker
            .transition(&job.id, JobState::Rejected { resource });
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        metrics::ADMISSION_REJECTIONS
            .with_label_values(&[label])
            .inc();
        metrics::JOBS_FINISHED.with_label_values(&["rejected"]).inc();

        self.notify(job, &notice).await;
        self.tracker.finish(&job.id);
    }

    async fn notify(&self, job: &Job, notice: &Notice) {
        if let Err(e) = self.transport.notify(job.requester_id, notice).await {
            warn!(job_id = %job.id, requester = job.requester_id, error = %e, "Failed to send notice");
        }
    }
}

fn queue_error_kind(err: &QueueError) -> &'static str {
    match err {
        QueueError::Connection(_) => "connection",
        QueueError::Storage(_) => "storage",
        QueueError::Serialization(_) => "serialization",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::SqliteJobQueue;
    use crate::testing::{fixtures, MockDelivery, MockFetchTool, StaticMemoryProbe};
    use tempfile::TempDir;

    fn pool(dir: &TempDir, config: WorkerConfig) -> WorkerPool {
        let transport = Arc::new(MockDelivery::new());
        let pipeline = ExecutionPipeline::new(
            Arc::new(MockFetchTool::new()),
            transport.clone(),
            fixtures::fetcher_config(dir.path()),
        );
        WorkerPool::new(
            config,
            Arc::new(SqliteJobQueue::in_memory().unwrap()),
            Arc::new(ResourceGate::new(Arc::new(StaticMemoryProbe::new(u64::MAX)), 0)),
            Arc::new(pipeline),
            transport,
        )
    }

    #[tokio::test]
    async fn test_admission_capacity() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir, WorkerConfig::default().with_count(3));
        assert_eq!(pool.admission().available_permits(), 5);

        let status = pool.status();
        assert!(!status.running);
        assert_eq!(status.worker_count, 3);
        assert_eq!(status.admission_capacity, 5);
        assert_eq!(status.queue_depth, Some(0));
    }

    #[tokio::test]
    async fn test_submit_counts_toward_queue_depth() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir, WorkerConfig::default());
        pool.submit(&fixtures::video_job("https://youtu.be/a", 1))
            .unwrap();
        assert_eq!(pool.status().queue_depth, Some(1));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir, WorkerConfig::default().with_fast_timings());

        pool.start().await;
        assert!(pool.is_running());
        pool.start().await;

        pool.shutdown().await;
        assert!(!pool.is_running());
        assert!(pool.cancellation_token().is_cancelled());

        pool.start().await;
        assert!(!pool.is_running());
    }
}
